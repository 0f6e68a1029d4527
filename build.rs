use std::process::Command;

fn main() {
  //-- git hash, empty when not built from a checkout
  let git_hash = Command::new("git")
    .args(&["log", "-1", "--format=%h"]).output()
    .ok()
    .and_then(|output| String::from_utf8(output.stdout).ok())
    .unwrap_or_default();
  println!("cargo:rustc-env=GIT_HASH={}", git_hash.trim());
}

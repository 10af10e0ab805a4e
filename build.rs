fn main() {
    // Version string for `--version`: the package version on a release tag,
    // `dev@<short hash>` everywhere else.
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");

    let git = |args: &[&str]| {
        std::process::Command::new("git")
            .args(args)
            .output()
            .ok()
            .filter(|o| o.status.success())
    };

    let hash = git(&["rev-parse", "--short", "HEAD"])
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_default();
    let on_tag = git(&["describe", "--exact-match", "--tags", "HEAD"]).is_some();

    println!("cargo:rustc-env=DEPLOY_DIR_GIT_HASH={hash}");
    println!("cargo:rustc-env=DEPLOY_DIR_ON_RELEASE_TAG={on_tag}");
}

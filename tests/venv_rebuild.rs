use std::{fs, path::PathBuf};

use pygrader::{
    process::{CommandCall, CommandOutput},
    venv::VirtualEnvironment,
};


use grader_support::{FakeRunner, temp_root};

/// Simulates `python -m venv <dir>` by writing a `pyvenv.cfg`, and `pip
/// install` by dropping a marker per installed name into site-packages.
fn simulated_python(call: &CommandCall) -> CommandOutput {
    if call.has_arg("venv") {
        let dir = PathBuf::from(call.args.last().expect("venv path"));
        fs::create_dir_all(dir.join("site-packages")).expect("create venv");
        fs::write(dir.join("pyvenv.cfg"), "home = /usr/bin\n").expect("write cfg");
    } else if call.has_arg("install") && !call.has_arg("-r") {
        let site = call
            .program
            .parent()
            .and_then(|bin| bin.parent())
            .expect("venv root")
            .join("site-packages");
        for arg in call.args.iter().skip(4) {
            fs::write(site.join(arg), "").expect("install marker");
        }
    }
    CommandOutput::ok("")
}

#[tokio::test]
async fn setup_always_rebuilds_from_scratch() {
    let root = temp_root("pygrader-venv");
    fs::write(root.join("requirements.txt"), "numpy\n").unwrap();

    // A previous run left an environment with a different dependency set, and
    // an old-style `venv` directory.
    fs::create_dir_all(root.join(".venv/site-packages")).unwrap();
    fs::write(root.join(".venv/site-packages/pandas"), "").unwrap();
    fs::create_dir_all(root.join("venv/bin")).unwrap();

    let runner = FakeRunner::new(simulated_python);
    let env = VirtualEnvironment::new(&root, runner.clone()).with_python("python3");
    {
        let active = env.setup().await.expect("setup");
        let site = active.path().join("site-packages");
        assert!(!site.join("pandas").exists());
        assert!(site.join("pylint").exists());
        assert!(site.join("coverage").exists());
        assert!(active.path().join("pyvenv.cfg").exists());
    }
    assert!(!root.join("venv").exists());

    // The environment persists by default, and the next setup replaces it.
    fs::write(root.join(".venv/site-packages/leftover"), "").unwrap();
    let _active = env.setup().await.expect("second setup");
    assert!(!root.join(".venv/site-packages/leftover").exists());

    let creations = runner.calls().iter().filter(|c| c.has_arg("venv")).count();
    assert_eq!(creations, 2);
    let _ = fs::remove_dir_all(root);
}

use onelock::lock::check_single_instance;
use onelock::{LockConfig, TeardownRegistry};
use std::fs;
use tempfile::TempDir;

fn config_in(temp: &TempDir) -> LockConfig {
    LockConfig::new("calibre").with_lock_dir(temp.path())
}

#[test]
fn test_second_instance_is_refused_until_teardown() {
    let temp = TempDir::new().unwrap();
    let config = config_in(&temp);
    let first = TeardownRegistry::new();
    let second = TeardownRegistry::new();

    assert!(check_single_instance(&config, "gui", &first));
    assert!(!check_single_instance(&config, "gui", &second));
    assert!(second.is_empty());

    first.run();

    let third = TeardownRegistry::new();
    assert!(check_single_instance(&config, "gui", &third));
}

#[cfg(unix)]
#[test]
fn test_teardown_removes_lock_file() {
    let temp = TempDir::new().unwrap();
    let config = config_in(&temp);
    let lock_file = temp.path().join(".calibre_gui.lock");
    let teardown = TeardownRegistry::new();

    assert!(check_single_instance(&config, "gui", &teardown));
    assert!(lock_file.exists());

    teardown.run();
    assert!(!lock_file.exists());
}

#[cfg(unix)]
#[test]
fn test_teardown_tolerates_missing_lock_file() {
    let temp = TempDir::new().unwrap();
    let config = config_in(&temp);
    let teardown = TeardownRegistry::new();

    assert!(check_single_instance(&config, "gui", &teardown));
    fs::remove_file(temp.path().join(".calibre_gui.lock")).unwrap();

    teardown.run();
    teardown.run();
}

#[cfg(unix)]
#[test]
fn test_unwritable_location_reads_as_other_instance() {
    let temp = TempDir::new().unwrap();
    // A regular file where the directory should be: open fails even for root
    let not_a_dir = temp.path().join("plain-file");
    fs::write(&not_a_dir, "").unwrap();
    let config = LockConfig::new("calibre").with_lock_dir(&not_a_dir);
    let teardown = TeardownRegistry::new();

    assert!(!check_single_instance(&config, "gui", &teardown));
    assert!(teardown.is_empty());
}

#[cfg(unix)]
#[test]
fn test_missing_directory_reads_as_other_instance() {
    let temp = TempDir::new().unwrap();
    let config = LockConfig::new("calibre").with_lock_dir(temp.path().join("gone"));

    assert!(!check_single_instance(&config, "gui", &TeardownRegistry::new()));
}

#[test]
fn test_names_and_apps_are_separate_namespaces() {
    let temp = TempDir::new().unwrap();
    let teardown = TeardownRegistry::new();

    assert!(check_single_instance(&config_in(&temp), "gui", &teardown));
    assert!(check_single_instance(&config_in(&temp), "server", &teardown));

    let other_app = LockConfig::new("ebook-viewer").with_lock_dir(temp.path());
    assert!(check_single_instance(&other_app, "gui", &teardown));
}

use super::*;
use serial_test::serial;
use tempfile::TempDir;

struct EnvGuard(Option<std::ffi::OsString>);

impl EnvGuard {
    fn set(value: &Path) -> Self {
        let previous = std::env::var_os(CONFIG_DIR_ENV);
        // SAFETY: every test touching the process environment runs under #[serial]
        unsafe { std::env::set_var(CONFIG_DIR_ENV, value) };
        Self(previous)
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: every test touching the process environment runs under #[serial]
        unsafe {
            match self.0.take() {
                Some(previous) => std::env::set_var(CONFIG_DIR_ENV, previous),
                None => std::env::remove_var(CONFIG_DIR_ENV),
            }
        }
    }
}

#[test]
#[serial]
fn env_override() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let _guard = EnvGuard::set(temp_dir.path());

    let dir = get_config_dir().expect("config dir resolves");
    assert_eq!(dir, temp_dir.path());
}

#[test]
#[serial]
fn explicit_dir_wins() {
    let env_dir = TempDir::new().expect("should create temp dir");
    let explicit = TempDir::new().expect("should create temp dir");
    let _guard = EnvGuard::set(env_dir.path());

    let dir = resolve_config_dir(Some(explicit.path())).expect("config dir resolves");
    assert_eq!(dir, explicit.path());

    let dir = resolve_config_dir(None).expect("config dir resolves");
    assert_eq!(dir, env_dir.path());
}

#[test]
#[serial]
fn default_dir_is_under_home() {
    let previous = std::env::var_os(CONFIG_DIR_ENV);
    // SAFETY: every test touching the process environment runs under #[serial]
    unsafe { std::env::remove_var(CONFIG_DIR_ENV) };

    if let Ok(dir) = get_config_dir() {
        assert!(dir.ends_with(".jobrec"));
    }

    if let Some(previous) = previous {
        // SAFETY: every test touching the process environment runs under #[serial]
        unsafe { std::env::set_var(CONFIG_DIR_ENV, previous) };
    }
}

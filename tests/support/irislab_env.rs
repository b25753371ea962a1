use std::{
    path::PathBuf,
    sync::{Mutex, OnceLock},
};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const VARS: [&str; 4] = [
    "IRISLAB_HOME",
    "IRISLAB_DB_PATH",
    "IRISLAB_COLLECTION",
    "IRISLAB_DATA_SOURCE",
];

/// Points `IRISLAB_HOME` at a scratch directory and clears the other
/// overrides until dropped.
pub struct IrislabEnvGuard {
    previous: Vec<(&'static str, Option<String>)>,
    _lock: std::sync::MutexGuard<'static, ()>,
}

impl IrislabEnvGuard {
    pub fn set_home(path: PathBuf) -> Self {
        let lock = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        let previous = VARS.iter().map(|&var| (var, std::env::var(var).ok())).collect();
        // SAFETY: tests run under a global lock to prevent concurrent env mutations.
        unsafe {
            for var in &VARS[1..] {
                std::env::remove_var(var);
            }
            std::env::set_var("IRISLAB_HOME", path);
        }
        Self {
            previous,
            _lock: lock,
        }
    }
}

impl Drop for IrislabEnvGuard {
    fn drop(&mut self) {
        for (var, value) in self.previous.drain(..) {
            // SAFETY: tests run under a global lock to prevent concurrent env mutations.
            unsafe {
                match value {
                    Some(value) => std::env::set_var(var, value),
                    None => std::env::remove_var(var),
                }
            }
        }
    }
}

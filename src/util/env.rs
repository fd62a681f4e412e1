//! Scoped environment variable overrides.
//!
//! Build generators read `CC`/`CXX`/`CXXFLAGS` from the process
//! environment, so the pipeline has to mutate it for the duration of a
//! subprocess invocation and put it back afterwards. `EnvScope` records
//! prior state at application time and restores it on drop, in reverse
//! order, on every exit path.
//!
//! Precondition (documented, not enforced by a lock): at most one pipeline
//! invocation mutates the scoped environment at a time.

use std::env;
use std::ffi::{OsStr, OsString};

/// Guard restoring environment variables to their prior state on drop.
///
/// Nested scopes compose: each scope captures the state its predecessor
/// left behind, so LIFO destruction restores the original environment.
#[must_use = "the overrides are reverted when the scope is dropped"]
pub struct EnvScope {
    saved: Vec<(OsString, Option<OsString>)>,
}

impl EnvScope {
    /// Apply `vars` to the process environment, remembering prior values.
    pub fn apply<I, K, V>(vars: I) -> EnvScope
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        let mut saved = Vec::new();
        for (key, value) in vars {
            let key = key.as_ref().to_os_string();
            saved.push((key.clone(), env::var_os(&key)));
            env::set_var(&key, value);
        }
        EnvScope { saved }
    }

    /// Run `work` with `vars` applied, restoring the environment before
    /// returning the result, whether `work` succeeded or not.
    pub fn with<I, K, V, T>(vars: I, work: impl FnOnce() -> T) -> T
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        let _scope = EnvScope::apply(vars);
        work()
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        for (key, prior) in self.saved.drain(..).rev() {
            match prior {
                Some(value) => env::set_var(&key, value),
                None => env::remove_var(&key),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_overrides_apply_and_restore() {
        env::set_var("AMPOULE_T_SET", "before");
        env::remove_var("AMPOULE_T_UNSET");

        EnvScope::with(
            [("AMPOULE_T_SET", "inside"), ("AMPOULE_T_UNSET", "inside")],
            || {
                assert_eq!(env::var("AMPOULE_T_SET").unwrap(), "inside");
                assert_eq!(env::var("AMPOULE_T_UNSET").unwrap(), "inside");
            },
        );

        assert_eq!(env::var("AMPOULE_T_SET").unwrap(), "before");
        assert!(env::var_os("AMPOULE_T_UNSET").is_none());
        env::remove_var("AMPOULE_T_SET");
    }

    #[test]
    #[serial]
    fn test_restores_on_unwind() {
        env::set_var("AMPOULE_T_PANIC", "before");

        let result = std::panic::catch_unwind(|| {
            EnvScope::with([("AMPOULE_T_PANIC", "inside")], || {
                panic!("stage failed");
            })
        });

        assert!(result.is_err());
        assert_eq!(env::var("AMPOULE_T_PANIC").unwrap(), "before");
        env::remove_var("AMPOULE_T_PANIC");
    }

    #[test]
    #[serial]
    fn test_nested_scopes_restore_lifo() {
        env::set_var("AMPOULE_T_NEST", "outer");

        {
            let _a = EnvScope::apply([("AMPOULE_T_NEST", "mid")]);
            {
                let _b = EnvScope::apply([("AMPOULE_T_NEST", "inner")]);
                assert_eq!(env::var("AMPOULE_T_NEST").unwrap(), "inner");
            }
            assert_eq!(env::var("AMPOULE_T_NEST").unwrap(), "mid");
        }

        assert_eq!(env::var("AMPOULE_T_NEST").unwrap(), "outer");
        env::remove_var("AMPOULE_T_NEST");
    }

    #[test]
    #[serial]
    fn test_same_key_twice_in_one_scope() {
        env::remove_var("AMPOULE_T_DUP");

        EnvScope::with(
            [("AMPOULE_T_DUP", "first"), ("AMPOULE_T_DUP", "second")],
            || {
                assert_eq!(env::var("AMPOULE_T_DUP").unwrap(), "second");
            },
        );

        assert!(env::var_os("AMPOULE_T_DUP").is_none());
    }
}

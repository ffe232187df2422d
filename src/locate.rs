// Copyright 2025 Pavel Roskin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Search for a capability database file

use std::{
    env,
    ffi::OsStr,
    path::{Path, PathBuf},
};

/// Environment variable with colon separated directories to search
pub const PATH_VARIABLE: &str = "GETCAP_PATH";

const DATABASE_DIRS: &[&str] = &["/etc", "/usr/share/misc"];

/// Errors reported when looking for a database file
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The database identifier is empty
    #[error("Invalid database name")]
    InvalidDatabaseName,
    /// No file for the database could be found
    #[error("File not found")]
    FileNotFound,
}

/// Returns all directories that are searched for database files
///
/// This function does not attempt to verify if the directories to be searched actually exist.
pub fn search_directories() -> Vec<PathBuf> {
    let mut search_dirs = vec![];

    // Lazily evaluated iterator, consumed at most once.
    let mut default_dirs = DATABASE_DIRS.iter().map(PathBuf::from);

    if let Some(dirs) = env::var_os(PATH_VARIABLE) {
        for dir in env::split_paths(&dirs) {
            if dir.as_os_str().is_empty() {
                // Empty directory means search the default locations.
                search_dirs.extend(&mut default_dirs);
            } else {
                search_dirs.push(dir);
            }
        }
    }

    // Search default locations (nothing is added if used already).
    search_dirs.extend(&mut default_dirs);

    search_dirs
}

/// Find the file for a database identifier
///
/// An identifier containing a path separator is used as the path itself. Other
/// identifiers are file names looked up in [`search_directories`].
///
/// Returns the file path if it exists, an error otherwise.
pub fn locate(db_name: impl AsRef<OsStr>) -> Result<PathBuf, Error> {
    let db_name = db_name.as_ref();
    if db_name.is_empty() {
        return Err(Error::InvalidDatabaseName);
    }

    let path = Path::new(db_name);
    if path.components().count() > 1 || path.is_absolute() {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(Error::FileNotFound)
        };
    }

    search_directories()
        .into_iter()
        .map(|dir| dir.join(db_name))
        .find(|file| file.is_file())
        .ok_or(Error::FileNotFound)
}

#[cfg(test)]
mod test {
    use std::fs::File;

    use tempfile::tempdir;

    use super::*;

    const DB_NAME: &str = "no-such-database-123.conf";

    #[test]
    fn empty_name() {
        assert_eq!(locate(""), Err(Error::InvalidDatabaseName));
    }

    #[test]
    fn missing_file() {
        // Not using DB_NAME to avoid racing with the tests that set the variable.
        assert_eq!(locate("no-such-database-1.conf"), Err(Error::FileNotFound));
    }

    #[test]
    fn explicit_path() {
        let temp_dir = tempdir().unwrap();
        let db_file = temp_dir.path().join("local.conf");
        File::create(&db_file).unwrap();
        assert_eq!(locate(&db_file), Ok(db_file.clone()));
        assert_eq!(
            locate(temp_dir.path().join("absent.conf")),
            Err(Error::FileNotFound)
        );
    }

    #[test]
    fn directory_is_not_a_database() {
        let temp_dir = tempdir().unwrap();
        assert_eq!(locate(temp_dir.path()), Err(Error::FileNotFound));
    }

    #[test]
    fn found_in_path_variable() {
        let temp_dir = tempdir().unwrap();
        let temp_dir = temp_dir.path();
        let db_file = temp_dir.join(DB_NAME);
        File::create(&db_file).unwrap();
        let search_path = format!("/no/such/dir:{}", temp_dir.display());

        temp_env::with_var(PATH_VARIABLE, Some(search_path), || {
            assert_eq!(locate(DB_NAME), Ok(db_file));
        });
    }

    #[test]
    fn search_order() {
        let expected_dirs: Vec<PathBuf> = ["/my/db1", "/my/db2", "/etc", "/usr/share/misc"]
            .iter()
            .map(PathBuf::from)
            .collect();

        temp_env::with_var(PATH_VARIABLE, Some("/my/db1:/my/db2"), || {
            assert_eq!(search_directories(), expected_dirs);
        });
    }

    #[test]
    fn search_order_with_empty_element() {
        let expected_dirs: Vec<PathBuf> = ["/my/db1", "/etc", "/usr/share/misc", "/my/db2"]
            .iter()
            .map(PathBuf::from)
            .collect();

        temp_env::with_var(PATH_VARIABLE, Some("/my/db1::/my/db2"), || {
            assert_eq!(search_directories(), expected_dirs);
        });
    }

    #[test]
    fn defaults_without_variable() {
        temp_env::with_var_unset(PATH_VARIABLE, || {
            assert_eq!(
                search_directories(),
                vec![PathBuf::from("/etc"), PathBuf::from("/usr/share/misc")]
            );
        });
    }
}

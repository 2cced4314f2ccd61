// Copyright © 2022 Nikita Dudko. All rights reserved.
// Contacts: <nikita.dudko.95@gmail.com>
// Licensed under the MIT License.

//! Persists a credential as `KEY = VALUE` lines in a plain text file,
//! keeping unrelated lines intact.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::auth::Credential;

const TOKEN_PREFIX: &str = "TOKEN = ";
const OWNER_ID_PREFIX: &str = "OWNER_ID = ";

/// Key-value store backed by a single file at an explicitly provided path.
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new<P: Into<PathBuf>>(path: P) -> Store {
        Store { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrites the recognized keys in place, appends them if absent and
    /// overwrites the whole file. Lines with other keys are kept verbatim
    /// and in their original order. The write isn't atomic: a crash in the
    /// middle of it can leave the file truncated.
    pub fn save(&self, credential: &Credential) -> crate::Result<()> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let mut output = String::new();
        let mut token_found = false;
        let mut owner_id_found = false;

        for line in contents.lines() {
            if line.starts_with(TOKEN_PREFIX) {
                output.push_str(TOKEN_PREFIX);
                output.push_str(&credential.access_token);
                token_found = true;
            } else if line.starts_with(OWNER_ID_PREFIX) {
                output.push_str(OWNER_ID_PREFIX);
                output.push_str(&credential.owner_id);
                owner_id_found = true;
            } else {
                output.push_str(line);
            }
            output.push('\n');
        }

        if !token_found {
            output.push_str(TOKEN_PREFIX);
            output.push_str(&credential.access_token);
            output.push('\n');
        }
        if !owner_id_found {
            output.push_str(OWNER_ID_PREFIX);
            output.push_str(&credential.owner_id);
            output.push('\n');
        }

        Ok(fs::write(&self.path, output)?)
    }

    /// Returns `None` when the file doesn't exist or either of the
    /// recognized keys is missing or empty.
    pub fn load(&self) -> crate::Result<Option<Credential>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut access_token = None;
        let mut owner_id = None;
        for line in contents.lines() {
            if let Some(value) = line.strip_prefix(TOKEN_PREFIX) {
                if !value.trim().is_empty() {
                    access_token = Some(value.trim().to_string());
                }
            } else if let Some(value) = line.strip_prefix(OWNER_ID_PREFIX) {
                if !value.trim().is_empty() {
                    owner_id = Some(value.trim().to_string());
                }
            }
        }

        Ok(match (access_token, owner_id) {
            (Some(access_token), Some(owner_id)) => Some(Credential {
                access_token,
                owner_id,
            }),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs, process};

    fn credential() -> Credential {
        Credential {
            access_token: "token123".to_string(),
            owner_id: "42".to_string(),
        }
    }

    fn temp_store(name: &str) -> Store {
        let mut path = env::temp_dir();
        path.push(format!("vksaver-config-{}-{}", process::id(), name));
        let _ = fs::remove_file(&path);
        Store::new(path)
    }

    #[test]
    fn save_to_fresh_file() {
        let store = temp_store("fresh");
        store.save(&credential()).unwrap();

        let contents = fs::read_to_string(store.path()).unwrap();
        assert_eq!(contents, "TOKEN = token123\nOWNER_ID = 42\n");
        fs::remove_file(store.path()).unwrap();
    }

    #[test]
    fn save_preserves_unrelated_lines() {
        let store = temp_store("preserve");
        fs::write(
            store.path(),
            "# personal VK settings\nTOKEN = old\nOWNER_ID = 1\n",
        ).unwrap();
        store.save(&credential()).unwrap();

        let contents = fs::read_to_string(store.path()).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(
            lines,
            ["# personal VK settings", "TOKEN = token123", "OWNER_ID = 42"]
        );
        fs::remove_file(store.path()).unwrap();
    }

    #[test]
    fn save_appends_missing_key() {
        let store = temp_store("append");
        fs::write(store.path(), "TOKEN = old\nCOMMENTARY = keep me\n").unwrap();
        store.save(&credential()).unwrap();

        let contents = fs::read_to_string(store.path()).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines, ["TOKEN = token123", "COMMENTARY = keep me", "OWNER_ID = 42"]);
        fs::remove_file(store.path()).unwrap();
    }

    #[test]
    fn load_round_trip() {
        let store = temp_store("round-trip");
        store.save(&credential()).unwrap();
        assert_eq!(store.load().unwrap(), Some(credential()));
        fs::remove_file(store.path()).unwrap();
    }

    #[test]
    fn load_missing_file() {
        let store = temp_store("missing-file");
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn load_requires_both_keys() {
        let store = temp_store("missing-key");
        fs::write(store.path(), "TOKEN = token123\n").unwrap();
        assert_eq!(store.load().unwrap(), None);

        fs::write(store.path(), "TOKEN = token123\nOWNER_ID = \n").unwrap();
        assert_eq!(store.load().unwrap(), None);
        fs::remove_file(store.path()).unwrap();
    }
}

// Copyright © 2022 Nikita Dudko. All rights reserved.
// Contacts: <nikita.dudko.95@gmail.com>
// Licensed under the MIT License.

use std::{
    fs,
    path::{Path, PathBuf},
};

const MAX_RESULTS: usize = 5;
const EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "heic"];

/// Finds at most 5 photos in `dir`, the most recently modified first.
/// Files are matched by extension, case-insensitively.
pub fn find_photos(dir: &Path) -> crate::Result<Vec<PathBuf>> {
    let mut photos = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !has_photo_extension(&path) {
            continue;
        }
        photos.push((entry.metadata()?.modified()?, path));
    }

    photos.sort_by(|(first, _), (second, _)| second.cmp(first));
    Ok(photos
        .into_iter()
        .map(|(_, path)| path)
        .take(MAX_RESULTS)
        .collect())
}

fn has_photo_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| EXTENSIONS.iter().any(|valid| valid.eq_ignore_ascii_case(extension)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs, process, thread, time::Duration};

    fn temp_dir(name: &str) -> PathBuf {
        let mut path = env::temp_dir();
        path.push(format!("vksaver-files-{}-{}", process::id(), name));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir(&path).unwrap();
        path
    }

    #[test]
    fn extension_matching() {
        assert!(has_photo_extension(Path::new("a.jpg")));
        assert!(has_photo_extension(Path::new("b.JPEG")));
        assert!(has_photo_extension(Path::new("c.Png")));
        assert!(has_photo_extension(Path::new("d.heic")));
        assert!(!has_photo_extension(Path::new("e.txt")));
        assert!(!has_photo_extension(Path::new("no-extension")));
    }

    #[test]
    fn skips_non_photos() {
        let dir = temp_dir("skips");
        fs::write(dir.join("photo.jpg"), "jpg").unwrap();
        fs::write(dir.join("notes.txt"), "txt").unwrap();

        let photos = find_photos(&dir).unwrap();
        assert_eq!(photos, [dir.join("photo.jpg")]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn newest_first_and_capped() {
        let dir = temp_dir("newest");
        for index in 0..7 {
            fs::write(dir.join(format!("photo{}.jpg", index)), "jpg").unwrap();
            // Keep modification times distinguishable.
            thread::sleep(Duration::from_millis(10));
        }

        let photos = find_photos(&dir).unwrap();
        assert_eq!(photos.len(), 5);
        assert_eq!(photos[0], dir.join("photo6.jpg"));
        assert_eq!(photos[4], dir.join("photo2.jpg"));
        fs::remove_dir_all(&dir).unwrap();
    }
}

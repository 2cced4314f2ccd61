// Copyright © 2022 Nikita Dudko. All rights reserved.
// Contacts: <nikita.dudko.95@gmail.com>
// Licensed under the MIT License.

//! Wrappers around the `photos.*` methods: uploading local files to the
//! upload server and copying the results into the user's saved photos.

use std::{
    fs::File,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use reqwest::blocking::{multipart, Client};

use crate::auth::Credential;

/// Pause between successive `photos.copy` calls
/// to respect the API rate limits.
const COPY_DELAY: Duration = Duration::from_millis(200);

pub struct Saver {
    client: Client,
    access_token: String,
}

/// A size variant of an uploaded photo.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct Size {
    #[serde(rename = "type")]
    kind: String,
    url: String,
    width: u32,
    height: u32,
}

/// The original-resolution variant, present only for some uploads.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct OrigPhoto {
    url: String,
    width: u32,
    height: u32,
}

/// A record returned by `photos.saveMessagesPhoto`. Every attribute is
/// optional: the server is free to omit any of them, and a photo without
/// `id` or `owner_id` can't be copied.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct Photo {
    #[serde(default)]
    album_id: Option<i64>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    owner_id: Option<i64>,
    #[serde(default)]
    access_key: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    web_view_token: Option<String>,
    #[serde(default)]
    sizes: Vec<Size>,
    #[serde(default)]
    orig_photo: Option<OrigPhoto>,
}

struct CopyArgs {
    owner_id: i64,
    photo_id: u64,
    // Not needed for public photos.
    access_key: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Saved,
    SkippedUnreadable(String),
    MissingAttributes,
    CopyFailed(String),
}

/// Result of processing a single input path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: Outcome,
}

#[derive(serde::Deserialize)]
struct ApiError {
    error_code: i64,
    error_msg: String,
}

#[derive(serde::Deserialize)]
struct Envelope<T> {
    response: Option<T>,
    error: Option<ApiError>,
}

#[derive(serde::Deserialize)]
struct UploadServer {
    upload_url: String,
}

/// Response of the upload server itself. `photo` is a JSON-encoded string
/// which `photos.saveMessagesPhoto` takes as is.
#[derive(serde::Deserialize)]
struct UploadedBatch {
    server: i64,
    photo: String,
    hash: String,
}

impl<T> Envelope<T> {
    fn into_result(self) -> crate::Result<T> {
        if let Some(e) = self.error {
            return Err(format!("API error {}: {}", e.error_code, e.error_msg).into());
        }
        self.response.ok_or_else(|| "empty API response".into())
    }
}

impl Photo {
    pub fn album_id(&self) -> Option<i64> {
        self.album_id
    }
    pub fn date(&self) -> Option<&chrono::DateTime<chrono::Utc>> {
        self.date.as_ref()
    }
    pub fn id(&self) -> Option<u64> {
        self.id
    }
    pub fn owner_id(&self) -> Option<i64> {
        self.owner_id
    }
    pub fn access_key(&self) -> Option<&str> {
        self.access_key.as_deref()
    }
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
    pub fn web_view_token(&self) -> Option<&str> {
        self.web_view_token.as_deref()
    }
    pub fn sizes(&self) -> &[Size] {
        &self.sizes
    }
    pub fn orig_photo(&self) -> Option<&OrigPhoto> {
        self.orig_photo.as_ref()
    }

    fn copy_args(&self) -> Option<CopyArgs> {
        match (self.id, self.owner_id) {
            (Some(photo_id), Some(owner_id)) => Some(CopyArgs {
                owner_id,
                photo_id,
                access_key: self.access_key.clone(),
            }),
            _ => None,
        }
    }
}

impl Size {
    pub fn kind(&self) -> &str {
        &self.kind
    }
    pub fn url(&self) -> &str {
        &self.url
    }
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
}

impl OrigPhoto {
    pub fn url(&self) -> &str {
        &self.url
    }
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Outcome {
    pub fn is_saved(&self) -> bool {
        *self == Outcome::Saved
    }
}

impl Saver {
    pub fn new(credential: &Credential) -> Saver {
        Saver {
            client: Client::new(),
            access_token: credential.access_token.clone(),
        }
    }

    /// Opens the given photos, uploads all readable ones in a single batch
    /// and copies each uploaded photo into the user's saved photos album.
    /// The returned list covers every input path.
    ///
    /// An unreadable file among others is skipped with a warning; when no
    /// file is readable, or the upload itself fails, the whole operation
    /// fails before/at the network boundary. A failed copy call only
    /// affects its own file.
    pub fn upload_and_save(&self, paths: &[PathBuf]) -> crate::Result<Vec<FileReport>> {
        let (opened, skipped) = open_photos(paths)?;
        let (opened_paths, files): (Vec<_>, Vec<_>) = opened.into_iter().unzip();

        println!("Uploading {} photo(s) to the upload server...", files.len());
        let photos = self.upload(&opened_paths, files)?;

        let mut reports = save_photos(&opened_paths, &photos, COPY_DELAY, |args| self.copy(args));
        reports.extend(skipped);
        Ok(reports)
    }

    /// Requests an upload server, posts all files to it in one multipart
    /// request and registers the batch with `photos.saveMessagesPhoto`.
    /// The returned descriptors are aligned with `paths`.
    fn upload(&self, paths: &[PathBuf], files: Vec<File>) -> crate::Result<Vec<Photo>> {
        let server: UploadServer = self.call(
            "photos.getMessagesUploadServer",
            &[("peer_id", "0".to_string())],
        )?;

        let mut form = multipart::Form::new();
        for (index, file) in files.into_iter().enumerate() {
            let name = paths[index]
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("photo.jpg")
                .to_string();
            let part = multipart::Part::reader(file)
                .mime_str(mime_type(&name))?
                .file_name(name);
            form = form.part(format!("file{}", index + 1), part);
        }

        let batch: UploadedBatch = self
            .client
            .post(&server.upload_url)
            .multipart(form)
            .send()?
            .error_for_status()?
            .json()?;

        self.call(
            "photos.saveMessagesPhoto",
            &[
                ("server", batch.server.to_string()),
                ("photo", batch.photo),
                ("hash", batch.hash),
            ],
        )
    }

    fn copy(&self, args: &CopyArgs) -> crate::Result<()> {
        let mut params = vec![
            ("owner_id", args.owner_id.to_string()),
            ("photo_id", args.photo_id.to_string()),
        ];
        if let Some(key) = &args.access_key {
            params.push(("access_key", key.clone()));
        }

        // photos.copy returns ID of the new photo, which isn't needed.
        let _: i64 = self.call("photos.copy", &params)?;
        Ok(())
    }

    fn call<T>(&self, method: &str, params: &[(&str, String)]) -> crate::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut form: Vec<(&str, String)> = vec![
            ("access_token", self.access_token.clone()),
            ("v", crate::API_VERSION.to_string()),
        ];
        form.extend(params.iter().map(|(key, value)| (*key, value.clone())));

        let envelope: Envelope<T> = self
            .client
            .post(crate::method_url(method))
            .form(&form)
            .send()?
            .error_for_status()?
            .json()?;
        envelope.into_result()
    }
}

/// Opens every path in binary mode. An unreadable path among others
/// produces a skip report; zero readable paths is an error, so a batch of
/// a single bad path fails outright.
fn open_photos(paths: &[PathBuf]) -> crate::Result<(Vec<(PathBuf, File)>, Vec<FileReport>)> {
    let mut opened = Vec::new();
    let mut skipped = Vec::new();

    for path in paths {
        match File::open(path) {
            Ok(file) => opened.push((path.clone(), file)),
            Err(e) => {
                eprintln!("Failed to open {}, skipping: {}", path.display(), e);
                skipped.push(FileReport {
                    path: path.clone(),
                    outcome: Outcome::SkippedUnreadable(e.to_string()),
                });
            }
        }
    }

    if opened.is_empty() {
        return Err("no readable photos to upload".into());
    }
    Ok((opened, skipped))
}

/// Issues a copy call per descriptor with `delay` between successive
/// iterations. A descriptor without `id` or `owner_id` is reported as
/// failed without a call; a copy error doesn't stop the rest.
fn save_photos<F>(
    paths: &[PathBuf],
    photos: &[Photo],
    delay: Duration,
    mut copy: F,
) -> Vec<FileReport>
where
    F: FnMut(&CopyArgs) -> crate::Result<()>,
{
    let mut reports = Vec::with_capacity(paths.len());
    for (index, path) in paths.iter().enumerate() {
        if index > 0 {
            thread::sleep(delay);
        }

        let outcome = match photos.get(index).and_then(Photo::copy_args) {
            None => {
                eprintln!("Missing attributes for photo {}", path.display());
                Outcome::MissingAttributes
            }
            Some(args) => match copy(&args) {
                Ok(()) => {
                    println!("Photo {} successfully saved", path.display());
                    Outcome::Saved
                }
                Err(e) => {
                    eprintln!("Failed to save photo {}: {}", path.display(), e);
                    Outcome::CopyFailed(e.to_string())
                }
            },
        };
        reports.push(FileReport {
            path: path.clone(),
            outcome,
        });
    }
    reports
}

fn mime_type(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or("");
    if extension.eq_ignore_ascii_case("png") {
        "image/png"
    } else if extension.eq_ignore_ascii_case("heic") {
        "image/heic"
    } else {
        "image/jpeg"
    }
}

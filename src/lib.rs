// Copyright © 2022 Nikita Dudko. All rights reserved.
// Contacts: <nikita.dudko.95@gmail.com>
// Licensed under the MIT License.

//! Uploads local photos to [VK](https://dev.vk.com/reference)
//! and copies them into the user's saved photos album.

pub mod auth;
pub mod config;
pub mod files;
pub mod photos;

use std::{error::Error, io::{self, Write}, result};

const API_BASE_URL: &str = "https://api.vk.com/method";
/// Used in requests related to the access token retrieving.
const OAUTH_BASE_URL: &str = "https://oauth.vk.com";
const API_VERSION: &str = "5.131";

pub type Result<T> = result::Result<T, Box<dyn Error>>;

/// Builds a full URL of an API method.
fn method_url(method: &str) -> String {
    format!("{}/{}", API_BASE_URL, method)
}

/// Prints `message` without a trailing newline,
/// then reads a line from the standard input and trims it.
pub fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

#[cfg(test)]
mod tests {
    #[test]
    fn method_url() {
        assert_eq!(
            super::method_url("photos.copy"),
            "https://api.vk.com/method/photos.copy"
        );
    }
}

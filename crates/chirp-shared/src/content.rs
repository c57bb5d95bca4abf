//! Post content rules.
//!
//! A post is 1 to 280 characters long and made of emoji only. Characters are
//! counted as Unicode scalar values, so a flag or a skin-toned emoji counts
//! as several characters.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{MAX_POST_CHARS, MIN_POST_CHARS};
use crate::error::ContentError;

// Extended_Pictographic covers the emoji themselves, Emoji_Component the
// joiners, variation selectors, skin tones, keycap bases and tag sequences.
static EMOJI_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\p{Extended_Pictographic}|\p{Emoji_Component})+$")
        .expect("hardcoded emoji regex is invalid - fix source code")
});

/// Returns `true` if every character of `text` is classified as emoji.
/// An empty string is not emoji.
pub fn is_emoji_only(text: &str) -> bool {
    EMOJI_ONLY.is_match(text)
}

/// Validate the content of a new post.
pub fn validate_post_content(content: &str) -> Result<(), ContentError> {
    let len = content.chars().count();

    if len < MIN_POST_CHARS {
        return Err(ContentError::Empty);
    }
    if len > MAX_POST_CHARS {
        return Err(ContentError::too_long(len));
    }
    if !is_emoji_only(content) {
        return Err(ContentError::NotEmoji);
    }

    Ok(())
}

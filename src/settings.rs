use gfx_hal::window;
use log::warn;
use std::env;

pub const APP_NAME: &str = "gfx-rs quad";
pub const TITLE: &str = "Hello World";

pub const DIMS: window::Extent2D = window::Extent2D {
    width: 800,
    height: 800,
};

/// Closes the window after this many presented frames.
pub const CLOSE_AFTER_VAR: &str = "QUAD_CLOSE_AFTER_FRAMES";

#[cfg(feature = "metal")]
pub const BACKEND: &str = "metal";

#[cfg(all(feature = "vulkan", not(feature = "metal")))]
pub const BACKEND: &str = "vulkan";

#[derive(Debug, Default, PartialEq)]
pub struct Settings {
    pub close_after: Option<u64>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_value(env::var(CLOSE_AFTER_VAR).ok().as_deref())
    }

    fn from_value(close_after: Option<&str>) -> Self {
        let close_after = close_after.and_then(|raw| match raw.trim().parse() {
            Ok(frames) => Some(frames),
            Err(_) => {
                warn!("Ignoring {}={:?}: not a frame count", CLOSE_AFTER_VAR, raw);
                None
            }
        });
        Settings { close_after }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_means_run_until_closed() {
        assert_eq!(Settings::from_value(None), Settings::default());
    }

    #[test]
    fn parses_frame_count() {
        assert_eq!(Settings::from_value(Some(" 5 ")).close_after, Some(5));
        assert_eq!(Settings::from_value(Some("0")).close_after, Some(0));
    }

    #[test]
    fn garbage_is_ignored() {
        assert_eq!(Settings::from_value(Some("soon")).close_after, None);
        assert_eq!(Settings::from_value(Some("-1")).close_after, None);
    }

    #[test]
    fn window_is_square() {
        assert_eq!(DIMS.width, 800);
        assert_eq!(DIMS.height, DIMS.width);
    }
}

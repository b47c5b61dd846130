use serde::{Deserialize, Serialize};

macro_rules! seq_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl $name {
            pub fn next(self) -> Self {
                Self(self.0.wrapping_add(1))
            }
        }
    };
}

seq_newtype!(SubmissionTicket);
seq_newtype!(CaptchaGeneration);

/// One of the two image inputs on the blend form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSlot {
    First,
    Second,
}

impl ImageSlot {
    pub const ALL: [ImageSlot; 2] = [ImageSlot::First, ImageSlot::Second];

    /// Multipart field name the backend expects for this slot.
    pub fn field_name(self) -> &'static str {
        match self {
            ImageSlot::First => "image1",
            ImageSlot::Second => "image2",
        }
    }

    pub fn index(self) -> usize {
        match self {
            ImageSlot::First => 0,
            ImageSlot::Second => 1,
        }
    }
}

/// File extensions the backend accepts for uploaded images.
pub const ACCEPTED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];

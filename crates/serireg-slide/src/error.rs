//! Fatal failure taxonomy for C2, per the error handling design: an
//! unreadable file or missing metadata is fatal for that slide, and fatal
//! for the whole set if the affected slide is the reference.

#[derive(Debug, thiserror::Error)]
pub enum SlideError {
    #[error("slide {src:?} could not be opened: {reason}")]
    UnreadableSlide { src: String, reason: String },

    #[error("slide {src:?} is missing required metadata: {what}")]
    MissingMetadata { src: String, what: &'static str },
}

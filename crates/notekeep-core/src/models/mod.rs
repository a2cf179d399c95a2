//! Data models for Notekeep

mod category;
mod note;
mod page;
mod user;

pub use category::{
    is_hex_color, Category, CategoryId, NewCategory, CATEGORY_PALETTE, FALLBACK_CATEGORY_COLOR,
};
pub use note::{NewNote, Note, NoteBuffer, NoteEdit, NoteId, NoteUpdate, NoteVersion};
pub use page::Page;
pub use user::UserProfile;

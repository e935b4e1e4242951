mod session;

pub use session::{ConversationFiles, FilesView};

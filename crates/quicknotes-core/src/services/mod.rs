//! Note-surface services: the session gate, the auth flow, the live note
//! list, the note editor, and the surface tying them together.

mod auth_flow;
mod editor;
mod feedback;
mod note_list;
mod session_gate;
mod surface;

pub use auth_flow::{AuthFlow, AuthMode, AuthOutcome};
pub use editor::{NoteEditor, ReminderSelection, SubmitOutcome, Transition};
pub use feedback::Feedback;
pub use note_list::{NoteListStore, NoteRow};
pub use session_gate::{check_session, sign_out, GateDecision};
pub use surface::{DeleteOutcome, NoteSurface, ToggleOutcome};

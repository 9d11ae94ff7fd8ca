use rfd::{MessageButtons, MessageDialog, MessageLevel};

/// Blocking error box for failures that end the program.
pub fn show_fatal(title: &str, err: &anyhow::Error) {
    MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title(title)
        .set_description(format!("{err:#}"))
        .set_buttons(MessageButtons::Ok)
        .show();
}

pub mod config;
pub mod run;
pub mod serve;

use std::path::PathBuf;

use clap::Args;

use facesync_daemon::SnapshotFactory;

/// Snapshot files backing the directory and messaging clients.
#[derive(Args, Debug, Clone)]
pub struct SnapshotArgs {
    /// JSON array of directory contacts.
    #[arg(long, value_name = "FILE")]
    pub directory_contacts: PathBuf,

    /// Directory that uploaded photos are written to.
    #[arg(long, value_name = "DIR")]
    pub directory_photos: PathBuf,

    /// JSON array of messaging-app contacts.
    #[arg(long, value_name = "FILE")]
    pub messaging_contacts: PathBuf,

    /// Directory of messaging-app avatars, one `<id>.jpg` per contact.
    #[arg(long, value_name = "DIR")]
    pub messaging_photos: PathBuf,
}

impl SnapshotArgs {
    pub fn factory(&self) -> SnapshotFactory {
        SnapshotFactory {
            directory_contacts: self.directory_contacts.clone(),
            directory_photos: self.directory_photos.clone(),
            messaging_contacts: self.messaging_contacts.clone(),
            messaging_photos: self.messaging_photos.clone(),
        }
    }
}

use clap::{Args, Subcommand};
use educonnect_core::media::{content_type_for, encode_data_url};
use educonnect_core::{MediaItem, MediaSet, MediaUploader, ObjectStore, UploadedMediaSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args)]
pub struct MediaCommand {
    #[command(subcommand)]
    pub command: MediaSubcommand,
}

#[derive(Subcommand)]
pub enum MediaSubcommand {
    /// Upload attachments for a post
    Upload {
        /// Post the attachments belong to
        #[arg(long)]
        post: String,

        /// Image file (can be repeated)
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,

        /// Video file
        #[arg(long, value_name = "PATH")]
        video: Option<PathBuf>,

        /// Other file (can be repeated)
        #[arg(long = "file", value_name = "PATH")]
        files: Vec<PathBuf>,

        /// Write the upload manifest here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Delete every attachment listed in an upload manifest
    Delete {
        /// Manifest written by `media upload`
        manifest: PathBuf,
    },
}

impl MediaCommand {
    pub async fn run(&self, store: Arc<dyn ObjectStore>) -> Result<(), Box<dyn std::error::Error>> {
        let uploader = MediaUploader::new(store);

        match &self.command {
            MediaSubcommand::Upload {
                post,
                images,
                video,
                files,
                output,
            } => {
                let media = MediaSet {
                    images: images.iter().map(|p| read_item(p)).collect::<Result<_, _>>()?,
                    video: video.as_deref().map(read_item).transpose()?,
                    files: files.iter().map(|p| read_item(p)).collect::<Result<_, _>>()?,
                };
                if media.is_empty() {
                    return Err("nothing to upload".into());
                }

                let uploaded = uploader
                    .upload_all(post, &media, |progress| {
                        eprintln!(
                            "[{}/{}] {}",
                            progress.uploaded, progress.total, progress.label
                        );
                    })
                    .await?;

                let manifest = serde_json::to_string_pretty(&uploaded)?;
                match output {
                    Some(path) => {
                        std::fs::write(path, manifest)?;
                        println!("Wrote manifest: {}", path.display());
                    }
                    None => println!("{}", manifest),
                }
                Ok(())
            }

            MediaSubcommand::Delete { manifest } => {
                let contents = std::fs::read_to_string(manifest)?;
                let uploaded: UploadedMediaSet = serde_json::from_str(&contents)?;

                let report = uploader.delete_all(&uploaded).await;
                println!("Deleted {} attachment(s)", report.deleted.len());
                if report.all_deleted() {
                    return Ok(());
                }
                for (path, e) in &report.failed {
                    println!("  failed: {} ({})", path, e);
                }
                Err(format!("{} attachment(s) could not be deleted", report.failed.len()).into())
            }
        }
    }
}

/// Reads a file into an upload item named after the file.
fn read_item(path: &Path) -> Result<MediaItem, Box<dyn std::error::Error>> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("invalid file name: {}", path.display()))?
        .to_string();
    let bytes = std::fs::read(path)?;

    Ok(MediaItem {
        data: encode_data_url(content_type_for(&name), &bytes),
        name,
    })
}

//! Console rendering of indexing progress.

use std::io::Write;

use mvnx_index::{Progress, SimpleProgress};

/// Human-readable form of a progress update.
pub fn message(progress: &Progress) -> String {
    match progress {
        Progress::Simple(simple) => simple_message(simple),
        Progress::Staged {
            description,
            stage,
            stage_total,
            progress,
        } => match stage_total {
            Some(total) => format!("Stage {stage}/{total}: {description}. {} ", simple_message(progress)),
            None => format!("Stage {stage}: {description}. {} ", simple_message(progress)),
        },
        Progress::Result {
            success_count,
            error_count,
        } => format!(
            "✅ Done indexing all artifacts!\n Statistics: \
             \n* Successfully indexed artifacts: {success_count}\
             \n* Errors: {error_count}\
             \n* Total number of artifacts processed: {}",
            success_count + error_count
        ),
    }
}

fn simple_message(progress: &SimpleProgress) -> String {
    match progress.total {
        Some(total) => format!("Progress: {}/{total} artifacts...", progress.current),
        None => format!("Progress: {} artifacts...", progress.current),
    }
}

/// Writes progress updates over one another on a single terminal line.
pub struct ProgressRenderer<W> {
    out: W,
    width: usize,
}

impl<W: Write> ProgressRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, width: 0 }
    }

    pub fn render(&mut self, progress: &Progress) -> std::io::Result<()> {
        let message = message(progress);
        if progress.is_result() {
            writeln!(self.out, "\r{message:<width$}", width = self.width)?;
            self.width = 0;
        } else {
            // Pad over whatever is left of a longer previous line.
            write!(self.out, "\r{message:<width$}", width = self.width)?;
            self.width = message.chars().count();
        }
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

//! Cancel command

use crate::cli::error::HelpfulError;
use crate::cli::session::{parse_batch_id, Session};

#[derive(Debug)]
pub struct CancelArgs {
    pub batch_id: String,
}

pub fn run(session: &Session, args: CancelArgs) -> anyhow::Result<()> {
    let id = parse_batch_id(&args.batch_id)?;
    let tracker = session.tracker()?;

    let cancelled = tracker
        .cancel(&id)
        .map_err(HelpfulError::from_batch_error)?;
    if cancelled {
        println!("Cancelled batch {}", id);
    } else {
        println!("Batch {} had already finished; nothing to cancel", id);
    }
    Ok(())
}

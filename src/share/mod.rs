mod sharer;
#[cfg(test)]
mod tests;

pub use sharer::{
    photo_filename, CommandShareTarget, PhotoSharer, ShareOutcome, ShareTarget, SharedFile,
};

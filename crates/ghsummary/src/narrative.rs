//! Plain-text narrative handed to the summarizer.

use std::fmt::Write as _;

use crate::activity::Activity;
use crate::aggregate::RepositoryDescription;

/// Assemble the narrative: a fixed preamble, one block per repository
/// description, then one block per activity in accumulation order.
pub fn render_narrative(
    username: &str,
    descriptions: &[RepositoryDescription],
    activities: &[Activity],
) -> String {
    let mut out = format!("Recent activities for user {username}:\n");
    out.push_str("Information about the repositories:\n");
    for desc in descriptions {
        let _ = write!(
            out,
            "{} repository description:\n{}\n\n",
            desc.repository, desc.readme
        );
    }
    for activity in activities {
        let _ = write!(
            out,
            "Type: {}\nRepository: {}\nContent: {}\n\n",
            activity.kind(),
            activity.repository(),
            activity.content()
        );
    }
    out
}

//! Pull requests that touch one service's directory.

use deploydash_core::ServiceId;
use deploydash_gateway::{parse_repository_url, PullRequest, VcsGateway};
use deploydash_store::Store;

use crate::error::SyncError;

/// Pull requests fetched per lookup; each one costs a file listing call.
pub const PULL_REQUEST_LIMIT: usize = 50;

/// Recent pull requests of the service's repository, in any state, that
/// change at least one file under the service path.
///
/// A pull request whose file list cannot be fetched is left out.
pub fn service_pull_requests<G: VcsGateway + ?Sized>(
    store: &Store,
    gateway: &G,
    service_id: ServiceId,
) -> Result<Vec<PullRequest>, SyncError> {
    let service = store.service(service_id)?;
    let repo = store.repository(service.repository_id)?;
    let coords = parse_repository_url(&repo.url)?;

    let pulls = gateway.list_pull_requests(&coords, PULL_REQUEST_LIMIT)?;
    tracing::debug!(repository = %coords, service = %service.name, pulls = pulls.len(), "filtering pull requests");

    let mut touching = Vec::new();
    for pull in pulls {
        let files = match gateway.pull_request_files(&coords, pull.number) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(repository = %coords, number = pull.number, error = %e, "pull request files unavailable");
                continue;
            }
        };
        if files.iter().any(|file| is_under(file, &service.path)) {
            touching.push(pull);
        }
    }
    Ok(touching)
}

/// Whether `file` lies inside directory `dir`. An empty or `.` directory
/// covers the whole repository.
fn is_under(file: &str, dir: &str) -> bool {
    let dir = dir.trim_start_matches("./").trim_matches('/');
    if dir.is_empty() || dir == "." {
        return true;
    }
    file.strip_prefix(dir)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("services/cart/src/lib.rs", "services/cart", true)]
    #[case("services/cart", "services/cart", true)]
    #[case("services/cart-ui/index.ts", "services/cart", false)]
    #[case("services/cart/main.go", "./services/cart/", true)]
    #[case("docs/readme.md", "services/cart", false)]
    #[case("anything.txt", "", true)]
    #[case("anything.txt", ".", true)]
    fn file_membership(#[case] file: &str, #[case] dir: &str, #[case] expected: bool) {
        assert_eq!(is_under(file, dir), expected);
    }
}

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread::available_parallelism;

use compio::dispatcher::{Dispatcher, DispatcherBuilder};
use futures_channel::oneshot;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use crate::ext::{PathExt, entry_name};
use crate::filesystem::{
    BuildError, BuildOutput, CancellationToken, DirectoryNode, EntryKind, Subtree, TreeBuilder,
    Walk,
};

/// Default number of worker threads when unable to determine system parallelism
const DEFAULT_WORKER_THREADS: usize = 1;

/// Root entries in listing order, with subdirectories still being built.
enum Slot {
    File(PathBuf),
    Directory {
        path: PathBuf,
        receiver: oneshot::Receiver<Result<Subtree, BuildError>>,
    },
}

/// Builds the subdirectories of the root on a pool of worker threads.
///
/// Each subtree is built by a sequential [`TreeBuilder`] that owns it until it
/// is handed back; the caller's task then merges the subtrees into the root
/// in listing order, so the result equals the sequential build.
///
/// A failed build cancels its token, so workers still walking other subtrees
/// stop at their next checkpoint.
pub struct ParallelTreeBuilder {
    dispatcher: Dispatcher,
    builder: TreeBuilder,
    token: CancellationToken,
}

impl ParallelTreeBuilder {
    pub fn new(
        builder: TreeBuilder,
        token: CancellationToken,
        workers: Option<NonZeroUsize>,
    ) -> Result<Self, ParallelBuildError> {
        let workers_num = workers.unwrap_or_else(Self::determine_worker_count);
        debug!("Using {} worker threads for subtree builds", workers_num);

        let dispatcher = DispatcherBuilder::new()
            .worker_threads(workers_num)
            .build()
            .context(DispatcherSnafu)?;

        Ok(Self {
            dispatcher,
            builder: builder.with_cancellation(token.clone()),
            token,
        })
    }

    /// Determines the optimal number of worker threads for subtree builds
    pub fn determine_worker_count() -> NonZeroUsize {
        available_parallelism()
            .ok()
            .and_then(|n| NonZeroUsize::new(n.get()))
            .or_else(|| NonZeroUsize::new(DEFAULT_WORKER_THREADS))
            .unwrap_or(NonZeroUsize::MIN)
    }

    pub async fn build(&self, root: impl AsRef<Path>) -> Result<BuildOutput, ParallelBuildError> {
        let result = self.build_and_merge(root.as_ref()).await;
        if result.is_err() {
            self.token.cancel();
        }
        result
    }

    async fn build_and_merge(&self, root: &Path) -> Result<BuildOutput, ParallelBuildError> {
        debug!("Building tree for {} in parallel", root.best_effort_display());

        let ancestors = self.builder.open_root(root).context(BuildSnafu)?;
        let (entries, unreadable) = self.builder.list_root(root).context(BuildSnafu)?;

        let mut walk = Walk::new(&self.builder, ancestors.clone());
        walk.recover_all(root, unreadable).context(BuildSnafu)?;
        let mut node = DirectoryNode::new(root.base_name(), root.to_path_buf());
        walk.stats.directories += 1;

        let mut slots = Vec::with_capacity(entries.len());
        for entry in entries {
            let path = entry.path();
            match self.builder.classify(&entry) {
                Ok(EntryKind::File) => slots.push(Slot::File(path)),
                Ok(EntryKind::Directory) => {
                    let name = entry_name(&entry.file_name());
                    let receiver = self.dispatch_subtree(path.clone(), name, ancestors.clone())?;
                    slots.push(Slot::Directory { path, receiver });
                }
                // Anything else is judged exactly as the sequential walk would.
                _ => walk.fill(&mut node, vec![entry]).context(BuildSnafu)?,
            }
        }
        info!("Dispatched {} subtree builds", slots.len());

        for slot in slots {
            self.builder.checkpoint().context(BuildSnafu)?;
            match slot {
                Slot::File(path) => {
                    walk.stats.files += 1;
                    node.push_file(path);
                }
                Slot::Directory { path, receiver } => {
                    let subtree = receiver
                        .await
                        .context(WorkerLostSnafu { path })?
                        .context(BuildSnafu)?;
                    walk.warnings.extend(subtree.warnings);
                    walk.stats.absorb(subtree.stats);
                    if let Some(child) = subtree.node {
                        walk.attach(&mut node, child);
                    }
                }
            }
        }

        debug!(
            "Built tree for {}: {} files in {} directories",
            root.display(),
            node.file_count(),
            walk.stats.directories
        );
        Ok(BuildOutput {
            tree: node,
            warnings: walk.warnings,
            stats: walk.stats,
        })
    }

    /// Hands the build of one subdirectory to a worker thread
    fn dispatch_subtree(
        &self,
        path: PathBuf,
        name: String,
        ancestors: Vec<PathBuf>,
    ) -> Result<oneshot::Receiver<Result<Subtree, BuildError>>, ParallelBuildError> {
        let builder = self.builder.clone();
        let dispatched_path = path.clone();

        let receiver = self
            .dispatcher
            .dispatch(move || async move {
                builder.build_subtree(dispatched_path, name, ancestors)
            })
            .map_err(|e| ParallelBuildError::DispatchError {
                path: path.clone(),
                error: e.to_string(),
            })?;

        debug!("Dispatched subtree {}", path.display());
        Ok(receiver)
    }
}

#[derive(Debug, Snafu)]
pub enum ParallelBuildError {
    #[snafu(display("Failed to create subtree dispatcher"))]
    DispatcherError { source: std::io::Error },
    #[snafu(display("Failed to dispatch subtree {}: {}", path.display(), error))]
    DispatchError { path: PathBuf, error: String },
    #[snafu(display("Worker building {} stopped before finishing", path.display()))]
    WorkerLostError {
        path: PathBuf,
        source: oneshot::Canceled,
    },
    #[snafu(display("Failed to build tree"))]
    BuildError { source: BuildError },
}

impl ParallelBuildError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ParallelBuildError::BuildError {
                source: BuildError::CancelledError
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};

    use tempfile::TempDir;

    use crate::filesystem::{BuildOptions, EntryOrder};

    fn layout(root: &Path) {
        for file in ["a.txt", "x/1.txt", "x/y/2.txt", "z/3.txt", "z/w/v/4.txt"] {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).expect("Failed to create dirs");
            File::create(path).expect("Failed to create file");
        }
        fs::create_dir_all(root.join("hollow")).expect("Failed to create dir");
    }

    fn builder() -> TreeBuilder {
        TreeBuilder::new(BuildOptions::default().order(EntryOrder::Name))
    }

    #[compio::test]
    async fn parallel_build_matches_sequential_build() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        layout(temp_dir.path());

        let sequential = builder()
            .build(temp_dir.path())
            .expect("sequential build should succeed");
        let parallel_builder =
            ParallelTreeBuilder::new(builder(), CancellationToken::new(), NonZeroUsize::new(3))
                .expect("dispatcher should start");
        let parallel = parallel_builder
            .build(temp_dir.path())
            .await
            .expect("parallel build should succeed");

        assert_eq!(parallel.tree, sequential.tree);
        assert_eq!(parallel.stats, sequential.stats);
        assert!(parallel.warnings.is_empty());
    }

    #[compio::test]
    async fn parallel_build_reports_missing_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let missing = temp_dir.path().join("missing");

        let result = ParallelTreeBuilder::new(builder(), CancellationToken::new(), None)
            .expect("dispatcher should start")
            .build(&missing)
            .await;

        assert!(matches!(
            result,
            Err(ParallelBuildError::BuildError {
                source: BuildError::NotFoundError { .. }
            })
        ));
    }

    #[compio::test]
    async fn cancelled_parallel_build_returns_no_tree() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        layout(temp_dir.path());
        let token = CancellationToken::new();
        let parallel = ParallelTreeBuilder::new(builder(), token.clone(), NonZeroUsize::new(2))
            .expect("dispatcher should start");
        token.cancel();

        let result = parallel.build(temp_dir.path()).await;

        assert!(result.is_err_and(|e| e.is_cancelled()));
    }

    #[cfg(unix)]
    #[compio::test]
    async fn failed_parallel_build_cancels_remaining_workers() {
        use std::os::unix::fs::PermissionsExt;

        use crate::filesystem::OnError;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        layout(root);
        let locked = root.join("locked");
        fs::create_dir(&locked).expect("Failed to create dir");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))
            .expect("Failed to change permissions");
        let effective = fs::read_dir(&locked).is_err();

        let token = CancellationToken::new();
        let options = BuildOptions::default()
            .on_error(OnError::Abort)
            .order(EntryOrder::Name);
        let result =
            ParallelTreeBuilder::new(TreeBuilder::new(options), token.clone(), NonZeroUsize::new(2))
                .expect("dispatcher should start")
                .build(root)
                .await;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))
            .expect("Failed to restore permissions");
        if !effective {
            return;
        }

        assert!(matches!(
            result,
            Err(ParallelBuildError::BuildError {
                source: BuildError::PermissionError { .. }
            })
        ));
        assert!(token.is_cancelled());
    }

    #[test]
    fn worker_count_is_never_zero() {
        assert!(ParallelTreeBuilder::determine_worker_count().get() >= 1);
    }
}

//! Bitbucket Server import workflow
//!
//! Drives the "import a project from Bitbucket Server" screen:
//!
//! 1. check that the personal access token stored for the ALM instance works
//! 2. list the Bitbucket projects it can see
//! 3. list the repositories of every project, all requests in flight at once
//! 4. publish the result as a single state update
//!
//! Each run rebuilds everything from scratch. Failures never surface to the
//! caller: a failed check reads as an invalid token, a failed listing as
//! missing data. A failure of any single repository listing discards the
//! whole repository map.
//!
//! Once [`BitbucketImportController::unmount`] is called, results still in
//! flight are dropped instead of being written to the state.

use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::services::alm_integration::{AlmIntegrationApi, AlmIntegrationError};
use crate::services::types::{AlmSettingsInstance, BitbucketProject, BitbucketRepository};

/// Invoked with the keys of newly created projects
pub type ProjectCreateCallback = Arc<dyn Fn(Vec<String>) + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportState {
    /// Only a single instance is handled: the first one configured
    pub bitbucket_setting: Option<AlmSettingsInstance>,
    pub importing: bool,
    pub loading: bool,
    /// `None` until the first check completes
    pub pat_is_valid: Option<bool>,
    pub projects: Option<Vec<BitbucketProject>>,
    /// Repositories keyed by Bitbucket project key
    pub project_repositories: Option<HashMap<String, Vec<BitbucketRepository>>>,
    pub selected_repository: Option<BitbucketRepository>,
    pub submitting_token: bool,
}

/// What the presentation layer renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportView {
    pub state: ImportState,
    pub can_admin: bool,
    /// True while either the workflow or the ALM settings list is loading
    pub loading: bool,
    pub show_personal_access_token_form: bool,
}

struct Inner {
    api: Arc<dyn AlmIntegrationApi>,
    state: watch::Sender<ImportState>,
    mounted: CancellationToken,
    settings_count: AtomicUsize,
    loading_bindings: AtomicBool,
    can_admin: bool,
    on_project_create: ProjectCreateCallback,
}

#[derive(Clone)]
pub struct BitbucketImportController {
    inner: Arc<Inner>,
}

impl BitbucketImportController {
    pub fn new(
        api: Arc<dyn AlmIntegrationApi>,
        bitbucket_settings: Vec<AlmSettingsInstance>,
        can_admin: bool,
        on_project_create: ProjectCreateCallback,
    ) -> Self {
        let settings_count = bitbucket_settings.len();
        let initial = ImportState {
            bitbucket_setting: bitbucket_settings.into_iter().next(),
            ..ImportState::default()
        };
        let (state, _) = watch::channel(initial);

        Self {
            inner: Arc::new(Inner {
                api,
                state,
                mounted: CancellationToken::new(),
                settings_count: AtomicUsize::new(settings_count),
                loading_bindings: AtomicBool::new(false),
                can_admin,
                on_project_create,
            }),
        }
    }

    /// Activate the controller and run the initial fetch
    pub async fn mount(&self) {
        self.fetch_initial_data().await;
    }

    /// Tear down: results arriving after this point are discarded
    pub fn unmount(&self) {
        // Cancelled under the state lock so no commit can interleave
        let mounted = &self.inner.mounted;
        self.inner.state.send_if_modified(|_| {
            mounted.cancel();
            false
        });
        debug!("Bitbucket import controller unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        !self.inner.mounted.is_cancelled()
    }

    pub fn snapshot(&self) -> ImportState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ImportState> {
        self.inner.state.subscribe()
    }

    pub fn view(&self) -> ImportView {
        let state = self.snapshot();
        let loading = state.loading || self.inner.loading_bindings.load(Ordering::SeqCst);
        let show_personal_access_token_form = !state.pat_is_valid.unwrap_or(false);

        ImportView {
            state,
            can_admin: self.inner.can_admin,
            loading,
            show_personal_access_token_form,
        }
    }

    /// Whether the list of ALM instances is still being fetched
    pub fn set_loading_bindings(&self, loading_bindings: bool) {
        self.inner
            .loading_bindings
            .store(loading_bindings, Ordering::SeqCst);
    }

    /// Feed a fresh list of configured instances
    ///
    /// Only the transition from no instance to some instance matters: the first
    /// one becomes active and the fetch restarts. Returns whether it restarted.
    pub async fn update_settings(&self, bitbucket_settings: Vec<AlmSettingsInstance>) -> bool {
        let previous = self
            .inner
            .settings_count
            .swap(bitbucket_settings.len(), Ordering::SeqCst);

        if previous != 0 || bitbucket_settings.is_empty() {
            return false;
        }

        let setting = bitbucket_settings.into_iter().next();
        info!(
            "Bitbucket instance {:?} became available, reloading",
            setting.as_ref().map(|s| s.key.as_str())
        );
        self.commit(|state| state.bitbucket_setting = setting);
        self.fetch_initial_data().await;
        true
    }

    /// Run the whole fetch pipeline and publish its outcome
    pub async fn fetch_initial_data(&self) {
        self.commit(|state| state.loading = true);

        let setting_key = self.setting_key();
        let setting_key = setting_key.as_deref();

        let pat_is_valid = self.check_personal_access_token(setting_key).await;

        let projects = if pat_is_valid {
            self.fetch_bitbucket_projects(setting_key).await
        } else {
            None
        };

        let project_repositories = match &projects {
            Some(projects) if !projects.is_empty() => {
                self.fetch_bitbucket_repositories(setting_key, projects)
                    .await
            }
            _ => None,
        };

        let committed = self.commit(|state| {
            state.pat_is_valid = Some(pat_is_valid);
            state.projects = projects;
            state.project_repositories = project_repositories;
            state.loading = false;
        });

        if !committed {
            debug!("Discarding Bitbucket data fetched after unmount");
        }
    }

    /// Store a new personal access token, then reload everything
    pub async fn submit_personal_access_token(&self, token: &str) {
        let Some(setting_key) = self.setting_key() else {
            return;
        };
        if token.is_empty() {
            return;
        }

        self.commit(|state| state.submitting_token = true);

        match self
            .inner
            .api
            .set_personal_access_token(&setting_key, token)
            .await
        {
            Ok(()) => {
                if self.commit(|state| state.submitting_token = false) {
                    self.fetch_initial_data().await;
                }
            }
            Err(e) => {
                warn!("Failed to store personal access token: {}", e);
                self.commit(|state| state.submitting_token = false);
            }
        }
    }

    pub fn select_repository(&self, repository: BitbucketRepository) {
        self.commit(|state| state.selected_repository = Some(repository));
    }

    /// Import the selected repository as a new project
    pub async fn import_repository(&self) {
        let (setting_key, repository) = {
            let state = self.inner.state.borrow();
            (
                state.bitbucket_setting.as_ref().map(|s| s.key.clone()),
                state.selected_repository.clone(),
            )
        };
        let (Some(setting_key), Some(repository)) = (setting_key, repository) else {
            return;
        };

        self.commit(|state| state.importing = true);

        match self
            .inner
            .api
            .import_bitbucket_server_project(
                &setting_key,
                &repository.project_key,
                &repository.slug,
            )
            .await
        {
            Ok(response) => {
                if self.commit(|state| state.importing = false) {
                    (self.inner.on_project_create)(vec![response.project.key]);
                }
            }
            Err(e) => {
                warn!(
                    "Failed to import {}/{}: {}",
                    repository.project_key, repository.slug, e
                );
                self.commit(|state| state.importing = false);
            }
        }
    }

    fn setting_key(&self) -> Option<String> {
        self.inner
            .state
            .borrow()
            .bitbucket_setting
            .as_ref()
            .map(|s| s.key.clone())
    }

    /// Apply an update unless unmounted; returns whether it was applied
    ///
    /// The liveness check runs while the state lock is held, the same lock
    /// `unmount` cancels under.
    fn commit(&self, update: impl FnOnce(&mut ImportState)) -> bool {
        let mounted = &self.inner.mounted;
        self.inner.state.send_if_modified(|state| {
            if mounted.is_cancelled() {
                return false;
            }
            update(state);
            true
        })
    }

    async fn check_personal_access_token(&self, setting_key: Option<&str>) -> bool {
        let Some(setting_key) = setting_key else {
            return false;
        };

        match self.inner.api.check_personal_access_token(setting_key).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!("Failed to check personal access token: {}", e);
                false
            }
        }
    }

    async fn fetch_bitbucket_projects(
        &self,
        setting_key: Option<&str>,
    ) -> Option<Vec<BitbucketProject>> {
        let setting_key = setting_key?;

        match self
            .inner
            .api
            .list_bitbucket_server_projects(setting_key)
            .await
        {
            Ok(response) => Some(response.projects),
            Err(e) => {
                warn!("Failed to list Bitbucket projects: {}", e);
                None
            }
        }
    }

    async fn fetch_bitbucket_repositories(
        &self,
        setting_key: Option<&str>,
        projects: &[BitbucketProject],
    ) -> Option<HashMap<String, Vec<BitbucketRepository>>> {
        let setting_key = setting_key?;
        let api = &self.inner.api;

        let requests = projects.iter().map(|project| async move {
            let response = api
                .search_bitbucket_server_repositories(setting_key, &project.name)
                .await?;
            Ok::<_, AlmIntegrationError>((project.key.clone(), response.repositories))
        });

        match try_join_all(requests).await {
            Ok(results) => Some(results.into_iter().collect()),
            Err(e) => {
                warn!("Failed to list Bitbucket repositories: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::alm_integration::AlmIntegrationResult;
    use crate::services::types::{
        AlmSettingsResponse, CreatedProject, ImportProjectResponse, ProjectsResponse,
        RepositoriesResponse,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    fn api_error() -> AlmIntegrationError {
        AlmIntegrationError::Api {
            status: 500,
            message: "boom".to_string(),
        }
    }

    fn project(key: &str, name: &str) -> BitbucketProject {
        BitbucketProject {
            id: None,
            key: key.to_string(),
            name: name.to_string(),
        }
    }

    fn repository(project_key: &str, slug: &str) -> BitbucketRepository {
        BitbucketRepository {
            id: None,
            name: slug.to_string(),
            project_key: project_key.to_string(),
            slug: slug.to_string(),
            sq_project_key: None,
        }
    }

    /// Scriptable stand-in for the web API
    struct MockAlmApi {
        pat_valid: Option<bool>,
        projects: Option<Vec<BitbucketProject>>,
        /// Keyed by project name, `None` makes that listing fail
        repositories: HashMap<String, Option<Vec<BitbucketRepository>>>,
        set_pat_succeeds: bool,
        imported_key: Option<String>,
        /// When set, the token check and the import wait for a permit
        gate: Option<Arc<Notify>>,
        check_calls: AtomicUsize,
        project_calls: AtomicUsize,
        repository_calls: AtomicUsize,
        set_pat_calls: AtomicUsize,
        import_calls: Mutex<Vec<(String, String, String)>>,
    }

    impl MockAlmApi {
        fn new() -> Self {
            Self {
                pat_valid: Some(true),
                projects: Some(vec![]),
                repositories: HashMap::new(),
                set_pat_succeeds: true,
                imported_key: Some("NEWKEY".to_string()),
                gate: None,
                check_calls: AtomicUsize::new(0),
                project_calls: AtomicUsize::new(0),
                repository_calls: AtomicUsize::new(0),
                set_pat_calls: AtomicUsize::new(0),
                import_calls: Mutex::new(Vec::new()),
            }
        }

        async fn wait_for_gate(&self) {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
        }
    }

    #[async_trait]
    impl AlmIntegrationApi for MockAlmApi {
        async fn list_alm_settings(&self) -> AlmIntegrationResult<AlmSettingsResponse> {
            Ok(AlmSettingsResponse {
                alm_settings: vec![],
            })
        }

        async fn check_personal_access_token(&self, _alm_setting: &str) -> AlmIntegrationResult<bool> {
            self.check_calls.fetch_add(1, Ordering::SeqCst);
            self.wait_for_gate().await;
            self.pat_valid.ok_or_else(api_error)
        }

        async fn set_personal_access_token(
            &self,
            _alm_setting: &str,
            _token: &str,
        ) -> AlmIntegrationResult<()> {
            self.set_pat_calls.fetch_add(1, Ordering::SeqCst);
            if self.set_pat_succeeds {
                Ok(())
            } else {
                Err(api_error())
            }
        }

        async fn list_bitbucket_server_projects(
            &self,
            _alm_setting: &str,
        ) -> AlmIntegrationResult<ProjectsResponse> {
            self.project_calls.fetch_add(1, Ordering::SeqCst);
            self.projects
                .clone()
                .map(|projects| ProjectsResponse { projects })
                .ok_or_else(api_error)
        }

        async fn search_bitbucket_server_repositories(
            &self,
            _alm_setting: &str,
            project_name: &str,
        ) -> AlmIntegrationResult<RepositoriesResponse> {
            self.repository_calls.fetch_add(1, Ordering::SeqCst);
            match self.repositories.get(project_name) {
                Some(Some(repositories)) => Ok(RepositoriesResponse {
                    is_last_page: true,
                    repositories: repositories.clone(),
                }),
                Some(None) => Err(api_error()),
                None => Ok(RepositoriesResponse {
                    is_last_page: true,
                    repositories: vec![],
                }),
            }
        }

        async fn import_bitbucket_server_project(
            &self,
            alm_setting: &str,
            project_key: &str,
            repository_slug: &str,
        ) -> AlmIntegrationResult<ImportProjectResponse> {
            self.import_calls.lock().unwrap().push((
                alm_setting.to_string(),
                project_key.to_string(),
                repository_slug.to_string(),
            ));
            self.wait_for_gate().await;
            self.imported_key
                .clone()
                .map(|key| ImportProjectResponse {
                    project: CreatedProject {
                        key,
                        name: "created".to_string(),
                    },
                })
                .ok_or_else(api_error)
        }
    }

    type CreatedKeys = Arc<Mutex<Vec<Vec<String>>>>;

    fn controller_with(
        api: Arc<MockAlmApi>,
        settings: Vec<AlmSettingsInstance>,
    ) -> (BitbucketImportController, CreatedKeys) {
        let created: CreatedKeys = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&created);
        let controller = BitbucketImportController::new(
            api,
            settings,
            true,
            Arc::new(move |keys| sink.lock().unwrap().push(keys)),
        );
        (controller, created)
    }

    fn r1() -> Vec<AlmSettingsInstance> {
        vec![AlmSettingsInstance::bitbucket("R1")]
    }

    #[tokio::test]
    async fn test_successful_pipeline_commits_everything() {
        let mut api = MockAlmApi::new();
        api.projects = Some(vec![project("P1", "proj1")]);
        api.repositories
            .insert("proj1".to_string(), Some(vec![repository("P1", "r1")]));
        let api = Arc::new(api);
        let (controller, _) = controller_with(Arc::clone(&api), r1());

        controller.mount().await;

        let state = controller.snapshot();
        assert_eq!(state.pat_is_valid, Some(true));
        assert_eq!(state.projects, Some(vec![project("P1", "proj1")]));
        let expected: HashMap<_, _> =
            [("P1".to_string(), vec![repository("P1", "r1")])].into_iter().collect();
        assert_eq!(state.project_repositories, Some(expected));
        assert!(!state.loading);
        assert!(!controller.view().show_personal_access_token_form);
    }

    #[tokio::test]
    async fn test_invalid_token_skips_listing() {
        let mut api = MockAlmApi::new();
        api.pat_valid = Some(false);
        let api = Arc::new(api);
        let (controller, _) = controller_with(Arc::clone(&api), r1());

        controller.mount().await;

        let state = controller.snapshot();
        assert_eq!(state.pat_is_valid, Some(false));
        assert_eq!(state.projects, None);
        assert_eq!(state.project_repositories, None);
        assert!(!state.loading);
        assert_eq!(api.project_calls.load(Ordering::SeqCst), 0);
        assert!(controller.view().show_personal_access_token_form);
    }

    #[tokio::test]
    async fn test_failed_token_check_reads_as_invalid() {
        let mut api = MockAlmApi::new();
        api.pat_valid = None;
        let api = Arc::new(api);
        let (controller, _) = controller_with(Arc::clone(&api), r1());

        controller.mount().await;

        let state = controller.snapshot();
        assert_eq!(state.pat_is_valid, Some(false));
        assert_eq!(state.projects, None);
        assert_eq!(state.project_repositories, None);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_failed_project_listing_is_absent() {
        let mut api = MockAlmApi::new();
        api.projects = None;
        let api = Arc::new(api);
        let (controller, _) = controller_with(Arc::clone(&api), r1());

        controller.mount().await;

        let state = controller.snapshot();
        assert_eq!(state.pat_is_valid, Some(true));
        assert_eq!(state.projects, None);
        assert_eq!(state.project_repositories, None);
        assert_eq!(api.repository_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_project_list_never_fetches_repositories() {
        let api = Arc::new(MockAlmApi::new());
        let (controller, _) = controller_with(Arc::clone(&api), r1());

        controller.mount().await;

        let state = controller.snapshot();
        assert_eq!(state.projects, Some(vec![]));
        assert_eq!(state.project_repositories, None);
        assert_eq!(api.repository_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_one_failed_repository_listing_discards_all() {
        let mut api = MockAlmApi::new();
        api.projects = Some(vec![
            project("P1", "proj1"),
            project("P2", "proj2"),
            project("P3", "proj3"),
        ]);
        api.repositories
            .insert("proj1".to_string(), Some(vec![repository("P1", "r1")]));
        api.repositories.insert("proj2".to_string(), None);
        api.repositories
            .insert("proj3".to_string(), Some(vec![repository("P3", "r3")]));
        let api = Arc::new(api);
        let (controller, _) = controller_with(Arc::clone(&api), r1());

        controller.mount().await;

        let state = controller.snapshot();
        assert_eq!(state.projects.as_ref().map(Vec::len), Some(3));
        assert_eq!(state.project_repositories, None);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_repositories_are_keyed_by_project_key() {
        let mut api = MockAlmApi::new();
        api.projects = Some(vec![project("P1", "proj1"), project("P2", "proj2")]);
        api.repositories.insert(
            "proj1".to_string(),
            Some(vec![repository("P1", "a"), repository("P1", "b")]),
        );
        let api = Arc::new(api);
        let (controller, _) = controller_with(Arc::clone(&api), r1());

        controller.mount().await;

        let repositories = controller.snapshot().project_repositories.unwrap();
        assert_eq!(api.repository_calls.load(Ordering::SeqCst), 2);
        let slugs: Vec<_> = repositories["P1"].iter().map(|r| r.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "b"]);
        assert!(repositories["P2"].is_empty());
    }

    #[tokio::test]
    async fn test_without_setting_nothing_is_called() {
        let api = Arc::new(MockAlmApi::new());
        let (controller, _) = controller_with(Arc::clone(&api), vec![]);

        controller.mount().await;

        let state = controller.snapshot();
        assert_eq!(state.pat_is_valid, Some(false));
        assert_eq!(state.projects, None);
        assert!(!state.loading);
        assert_eq!(api.check_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_results_after_unmount_are_discarded() {
        let gate = Arc::new(Notify::new());
        let mut api = MockAlmApi::new();
        api.projects = Some(vec![project("P1", "proj1")]);
        api.gate = Some(Arc::clone(&gate));
        let api = Arc::new(api);
        let (controller, _) = controller_with(Arc::clone(&api), r1());
        let mut updates = controller.subscribe();

        let task = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.mount().await })
        };

        updates.wait_for(|state| state.loading).await.unwrap();
        controller.unmount();
        let before = controller.snapshot();

        gate.notify_one();
        task.await.unwrap();

        assert_eq!(controller.snapshot(), before);
        assert_eq!(before.pat_is_valid, None);
        assert!(before.loading);
    }

    #[tokio::test]
    async fn test_import_completion_after_unmount_does_not_notify() {
        let gate = Arc::new(Notify::new());
        let mut api = MockAlmApi::new();
        api.gate = Some(Arc::clone(&gate));
        let api = Arc::new(api);
        let (controller, created) = controller_with(Arc::clone(&api), r1());
        let mut updates = controller.subscribe();

        controller.select_repository(repository("P1", "r1"));
        let task = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.import_repository().await })
        };

        updates.wait_for(|state| state.importing).await.unwrap();
        controller.unmount();

        gate.notify_one();
        task.await.unwrap();

        assert!(controller.snapshot().importing);
        assert!(created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_settings_arrival_restarts_once() {
        let api = Arc::new(MockAlmApi::new());
        let (controller, _) = controller_with(Arc::clone(&api), vec![]);

        controller.mount().await;
        assert_eq!(api.check_calls.load(Ordering::SeqCst), 0);

        assert!(controller.update_settings(r1()).await);
        assert_eq!(api.check_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            controller.snapshot().bitbucket_setting,
            Some(AlmSettingsInstance::bitbucket("R1"))
        );
        assert_eq!(controller.snapshot().pat_is_valid, Some(true));

        assert!(!controller.update_settings(r1()).await);
        assert_eq!(api.check_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_settings_update_when_already_configured_is_ignored() {
        let api = Arc::new(MockAlmApi::new());
        let (controller, _) = controller_with(Arc::clone(&api), r1());

        controller.mount().await;
        let changed = controller
            .update_settings(vec![AlmSettingsInstance::bitbucket("R2")])
            .await;

        assert!(!changed);
        assert_eq!(api.check_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            controller.snapshot().bitbucket_setting.map(|s| s.key),
            Some("R1".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_token_is_ignored() {
        let api = Arc::new(MockAlmApi::new());
        let (controller, _) = controller_with(Arc::clone(&api), r1());
        let updates = controller.subscribe();

        controller.submit_personal_access_token("").await;

        assert!(!updates.has_changed().unwrap());
        assert!(!controller.snapshot().submitting_token);
        assert_eq!(api.set_pat_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_token_without_setting_is_ignored() {
        let api = Arc::new(MockAlmApi::new());
        let (controller, _) = controller_with(Arc::clone(&api), vec![]);

        controller.submit_personal_access_token("secret").await;

        assert_eq!(api.set_pat_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_token_submission_reloads() {
        let api = Arc::new(MockAlmApi::new());
        let (controller, _) = controller_with(Arc::clone(&api), r1());

        controller.submit_personal_access_token("secret").await;

        let state = controller.snapshot();
        assert!(!state.submitting_token);
        assert_eq!(state.pat_is_valid, Some(true));
        assert_eq!(api.set_pat_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.check_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_token_submission_only_resets_flag() {
        let mut api = MockAlmApi::new();
        api.set_pat_succeeds = false;
        let api = Arc::new(api);
        let (controller, _) = controller_with(Arc::clone(&api), r1());

        controller.submit_personal_access_token("secret").await;

        let state = controller.snapshot();
        assert!(!state.submitting_token);
        assert_eq!(state.pat_is_valid, None);
        assert_eq!(api.check_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_import_notifies_with_new_key() {
        let api = Arc::new(MockAlmApi::new());
        let (controller, created) = controller_with(Arc::clone(&api), r1());

        controller.select_repository(repository("P1", "r1"));
        controller.import_repository().await;

        assert!(!controller.snapshot().importing);
        assert_eq!(*created.lock().unwrap(), vec![vec!["NEWKEY".to_string()]]);
        assert_eq!(
            *api.import_calls.lock().unwrap(),
            vec![("R1".to_string(), "P1".to_string(), "r1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failed_import_only_resets_flag() {
        let mut api = MockAlmApi::new();
        api.imported_key = None;
        let api = Arc::new(api);
        let (controller, created) = controller_with(Arc::clone(&api), r1());

        controller.select_repository(repository("P1", "r1"));
        controller.import_repository().await;

        assert!(!controller.snapshot().importing);
        assert!(created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_without_selection_is_ignored() {
        let api = Arc::new(MockAlmApi::new());
        let (controller, created) = controller_with(Arc::clone(&api), r1());

        controller.import_repository().await;

        assert!(!controller.snapshot().importing);
        assert!(api.import_calls.lock().unwrap().is_empty());
        assert!(created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unmount_rejects_later_updates_without_notifying() {
        let api = Arc::new(MockAlmApi::new());
        let (controller, _) = controller_with(Arc::clone(&api), r1());
        let updates = controller.subscribe();

        controller.unmount();
        assert!(!controller.is_mounted());
        assert!(!updates.has_changed().unwrap());

        controller.select_repository(repository("P1", "r1"));
        controller.fetch_initial_data().await;

        assert!(!updates.has_changed().unwrap());
        assert_eq!(controller.snapshot(), ImportState {
            bitbucket_setting: Some(AlmSettingsInstance::bitbucket("R1")),
            ..ImportState::default()
        });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_unmount_never_loses_to_a_commit() {
        for _ in 0..50 {
            let api = Arc::new(MockAlmApi::new());
            let (controller, _) = controller_with(Arc::clone(&api), r1());

            let selector = {
                let controller = controller.clone();
                tokio::spawn(async move {
                    for _ in 0..100 {
                        controller.select_repository(repository("P1", "r1"));
                    }
                })
            };
            tokio::task::yield_now().await;
            controller.unmount();
            let after_unmount = controller.snapshot();

            selector.await.unwrap();
            assert_eq!(controller.snapshot(), after_unmount);
        }
    }

    #[tokio::test]
    async fn test_view_combines_loading_flags() {
        let api = Arc::new(MockAlmApi::new());
        let (controller, _) = controller_with(Arc::clone(&api), r1());

        let view = controller.view();
        assert!(!view.loading);
        assert!(view.can_admin);
        assert!(view.show_personal_access_token_form);

        controller.set_loading_bindings(true);
        assert!(controller.view().loading);
    }
}

//! High-level API client: layers, features, asynchronous tasks, data import.

use std::fs::File;
use std::path::Path;
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, TesseraError};
use crate::feature::{self, Feature};
use crate::layer::{self, Layer, LayerSpec};
use crate::query::{FeatureQuery, LayerQuery};
use crate::request::Transport;
use crate::task::{self, PollPolicy, Task, TaskOutcome, TaskRecord, TaskState};

/// Versioned path prefix shared by every API call.
const API_PREFIX: &str = "/geo/1";

/// Default delay between poll passes while waiting for tasks.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Counts reported by a bulk feature delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DeleteStats {
    pub num_features: u64,
    pub num_points: u64,
}

/// Options for [`Client::import_geodata`].
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Spatial reference system to assign to the imported layers.
    pub srid: Option<u32>,
    /// Source attribute names to carry over as user fields.
    pub dat_fields: Vec<String>,
    /// Delay between checks while the server validates the upload.
    pub state_check_interval: Duration,
    /// Delay between poll passes while the import task runs.
    pub poll_interval: Duration,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            srid: None,
            dat_fields: Vec::new(),
            state_check_interval: Duration::from_secs(5),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_srid(mut self, srid: u32) -> Self {
        self.srid = Some(srid);
        self
    }

    pub fn with_dat_fields(mut self, fields: Vec<String>) -> Self {
        self.dat_fields = fields;
        self
    }

    pub fn with_state_check_interval(mut self, interval: Duration) -> Self {
        self.state_check_interval = interval;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Client for the remote geospatial API.
///
/// All calls are synchronous and go through a signed, retrying transport.
///
/// ```ignore
/// use tessera::{Client, Config, LayerQuery};
///
/// let config = Config::new("api.tessera.io:443", "my-key-id", "my-secret");
/// let client = Client::new(config)?;
/// for layer in client.get_layers(&LayerQuery::new())? {
///     println!("{} ({} features)", layer.name, layer.num_features);
/// }
/// ```
pub struct Client {
    transport: Transport,
}

impl Client {
    /// Build a client from an explicit configuration.
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(config)?,
        })
    }

    /// Build a client configured from `TESSERA_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env())
    }

    pub fn config(&self) -> &Config {
        self.transport.config()
    }

    /// Exchange credentials for a session token.
    ///
    /// Later requests send `X-Session-ID` instead of a per-request
    /// signature, until [`logout`](Self::logout).
    pub fn login(&mut self, username: &str, key: &str) -> Result<()> {
        let body = json!({ "username": username, "key": key });
        let res = self.transport.post(&format!("{}/login", API_PREFIX), &body)?;
        let token = res.get("more").and_then(Value::as_str).ok_or_else(|| {
            TesseraError::Response("login response without a session token".to_string())
        })?;
        self.transport.set_session(Some(token.to_string()));
        info!(username, "session established");
        Ok(())
    }

    /// Drop the session token and return to per-request signing.
    pub fn logout(&mut self) {
        self.transport.set_session(None);
    }

    // ---- layers ----

    /// List layers matching `query`, following pagination to the end.
    pub fn get_layers(&self, query: &LayerQuery) -> Result<Vec<Layer>> {
        let path = format!("{}/layers", API_PREFIX);
        let mut layers = Vec::new();
        for page in self.transport.pages(&path, &query.to_params()) {
            layers.extend(layer::parse_page(page?)?);
        }
        Ok(layers)
    }

    /// Create layers and return the stored records, in submission order.
    pub fn add_layers(&self, specs: &[LayerSpec]) -> Result<Vec<Layer>> {
        let path = format!("{}/layers", API_PREFIX);
        let body = serde_json::to_value(specs)?;
        let res = self.transport.post(&path, &body)?;
        serde_json::from_value(res).map_err(Into::into)
    }

    /// Change a subset of a layer's attributes.
    pub fn update_layer(&self, uuid: &str, changes: &LayerSpec) -> Result<()> {
        let path = format!("{}/layers/{}", API_PREFIX, uuid);
        let body = serde_json::to_value(changes)?;
        self.transport.put(&path, &body)?;
        Ok(())
    }

    /// Delete one layer and everything in it.
    pub fn delete_layer(&self, uuid: &str) -> Result<()> {
        let path = format!("{}/layers/{}", API_PREFIX, uuid);
        self.transport.delete(&path, &[])?;
        Ok(())
    }

    /// Delete all layers owned by this account.
    pub fn delete_layers(&self) -> Result<()> {
        self.transport.delete(&format!("{}/layers", API_PREFIX), &[])?;
        Ok(())
    }

    // ---- features ----

    /// List a layer's features matching `query`, following pagination.
    pub fn get_features(&self, layer_uuid: &str, query: &FeatureQuery) -> Result<Vec<Feature>> {
        let path = format!("{}/layers/{}/features", API_PREFIX, layer_uuid);
        let mut features = Vec::new();
        for page in self.transport.pages(&path, &query.to_params()?) {
            features.extend(feature::parse_page(page?)?);
        }
        Ok(features)
    }

    /// Store features in a layer and return the stored records.
    ///
    /// Inputs larger than the configured upload batch size are sent in
    /// several requests.
    pub fn add_features(&self, layer_uuid: &str, features: &[Feature]) -> Result<Vec<Feature>> {
        let path = format!("{}/layers/{}/features", API_PREFIX, layer_uuid);
        let batch_size = self.config().upload_batch_size.max(1);
        let mut stored = Vec::with_capacity(features.len());
        for chunk in features.chunks(batch_size) {
            let body = serde_json::to_value(feature::to_collection(chunk))?;
            let res = self.transport.post(&path, &body)?;
            stored.extend(feature::parse_collection(res)?);
        }
        Ok(stored)
    }

    /// Delete the features matching `query`. Returns the removed counts.
    pub fn delete_features(&self, layer_uuid: &str, query: &FeatureQuery) -> Result<DeleteStats> {
        let path = format!("{}/layers/{}/features", API_PREFIX, layer_uuid);
        let res = self.transport.delete(&path, &query.to_params()?)?;
        serde_json::from_value(res).map_err(Into::into)
    }

    /// Delete one feature. Returns the number of points removed.
    pub fn delete_feature(&self, layer_uuid: &str, feature_uuid: &str) -> Result<u64> {
        let path = format!(
            "{}/layers/{}/features/{}",
            API_PREFIX, layer_uuid, feature_uuid
        );
        let res = self.transport.delete(&path, &[])?;
        res.get("num_points").and_then(Value::as_u64).ok_or_else(|| {
            TesseraError::Response("delete response without a num_points count".to_string())
        })
    }

    // ---- tasks ----

    /// Submit tasks and poll until each reaches a terminal state, sleeping
    /// `interval` between poll passes.
    ///
    /// Output slot `i` belongs to `tasks[i]`: the decoded result payloads on
    /// success, the failure reason on failure, or `None` when polling
    /// stopped before the task resolved. Uses the default
    /// [`PollPolicy::BestEffort`].
    pub fn execute_tasks(
        &self,
        tasks: &[Task],
        interval: Duration,
    ) -> Result<Vec<Option<TaskOutcome>>> {
        self.execute_tasks_with_policy(tasks, PollPolicy::default(), interval)
    }

    /// [`execute_tasks`](Self::execute_tasks) with an explicit error policy
    /// and poll interval.
    ///
    /// Under [`PollPolicy::BestEffort`] an API error during polling stops
    /// the loop and returns the outcomes gathered so far; under
    /// [`PollPolicy::Strict`] it is propagated. Malformed result payloads
    /// are an error under either policy.
    pub fn execute_tasks_with_policy(
        &self,
        tasks: &[Task],
        policy: PollPolicy,
        interval: Duration,
    ) -> Result<Vec<Option<TaskOutcome>>> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }
        let records = self.submit_tasks(tasks)?;
        let mut outcomes: Vec<Option<TaskOutcome>> = vec![None; records.len()];
        let mut pending: Vec<usize> = (0..records.len()).collect();

        while !pending.is_empty() {
            let mut unresolved = Vec::with_capacity(pending.len());
            for &index in &pending {
                match self.check_task(&records[index]) {
                    Ok(Some(outcome)) => outcomes[index] = Some(outcome),
                    Ok(None) => unresolved.push(index),
                    Err(err) => match policy {
                        PollPolicy::Strict => return Err(err),
                        PollPolicy::BestEffort => {
                            if let TesseraError::Api {
                                status, message, ..
                            } = &err
                            {
                                warn!(status = ?status, message = %message, "task polling stopped early");
                                return Ok(outcomes);
                            }
                            return Err(err);
                        }
                    },
                }
            }
            pending = unresolved;
            if !pending.is_empty() {
                debug!(pending = pending.len(), "tasks still pending after poll pass");
                thread::sleep(interval);
            }
        }
        Ok(outcomes)
    }

    fn submit_tasks(&self, tasks: &[Task]) -> Result<Vec<TaskRecord>> {
        let path = format!("{}/tasks", API_PREFIX);
        let body = Value::Array(tasks.iter().map(Task::to_wire).collect());
        let res = self.transport.post(&path, &body)?;
        let records: Vec<TaskRecord> = serde_json::from_value(res)?;
        if records.len() != tasks.len() {
            return Err(TesseraError::Response(format!(
                "submitted {} tasks but the server acknowledged {}",
                tasks.len(),
                records.len()
            )));
        }
        debug!(count = records.len(), "tasks submitted");
        Ok(records)
    }

    /// One poll step for one task: `None` while it is still running.
    fn check_task(&self, submitted: &TaskRecord) -> Result<Option<TaskOutcome>> {
        let record = self.get_task(&submitted.uuid)?;
        match record.state {
            TaskState::Started => Ok(None),
            TaskState::Failure => Ok(Some(TaskOutcome::Failed {
                error: record.reason.unwrap_or_default(),
            })),
            TaskState::Success => {
                let payloads = self.task_results(&record.uuid)?;
                Ok(Some(TaskOutcome::Completed(payloads)))
            }
        }
    }

    fn get_task(&self, uuid: &str) -> Result<TaskRecord> {
        let res = self
            .transport
            .get(&format!("{}/tasks/{}", API_PREFIX, uuid), &[])?;
        serde_json::from_value(res).map_err(Into::into)
    }

    /// Decode every result payload of a finished task, across all pages.
    fn task_results(&self, uuid: &str) -> Result<Vec<Value>> {
        let path = format!("{}/tasks/{}/results", API_PREFIX, uuid);
        let mut payloads = Vec::new();
        for page in self.transport.pages(&path, &[]) {
            for result in task::parse_results_page(page?)? {
                payloads.push(serde_json::from_str(&result.tag)?);
            }
        }
        Ok(payloads)
    }

    // ---- data import ----

    /// Upload a data archive and run the server-side import, returning the
    /// import report.
    ///
    /// The archive is uploaded as a blob and validated server-side, then an
    /// `import_geospatial_data` task consumes it. The blob is deleted once
    /// the task has finished, whatever its outcome.
    pub fn import_geodata(&self, path: impl AsRef<Path>, options: &ImportOptions) -> Result<Value> {
        let archive = File::open(path.as_ref())?;
        let blob_uuid = self.upload_blob(&archive)?;
        info!(blob_uuid = %blob_uuid, path = %path.as_ref().display(), "archive uploaded");
        self.wait_for_blob(&blob_uuid, options.state_check_interval)?;

        let mut import =
            Task::new("import_geospatial_data").with_extra("blob_uuid", blob_uuid.as_str());
        if let Some(srid) = options.srid {
            import = import.with_extra("srid", srid);
        }
        if !options.dat_fields.is_empty() {
            import = import.with_extra("dat_fields", options.dat_fields.clone());
        }
        let mut outcomes = self.execute_tasks_with_policy(
            std::slice::from_ref(&import),
            PollPolicy::BestEffort,
            options.poll_interval,
        )?;

        self.delete_blob_best_effort(&blob_uuid);

        match outcomes.pop().flatten() {
            Some(TaskOutcome::Completed(mut payloads)) => {
                if payloads.is_empty() {
                    return Err(TesseraError::Response(
                        "import task finished without a report".to_string(),
                    ));
                }
                Ok(payloads.remove(0))
            }
            Some(TaskOutcome::Failed { error }) => Err(TesseraError::Api {
                status: None,
                code: None,
                message: error,
                more: None,
            }),
            None => Err(TesseraError::Response(
                "import task did not resolve".to_string(),
            )),
        }
    }

    fn upload_blob(&self, archive: &File) -> Result<String> {
        let res = self
            .transport
            .post_stream(&format!("{}/blobs", API_PREFIX), archive)?;
        res.get("uuid")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| {
                TesseraError::Response("blob upload response without a uuid".to_string())
            })
    }

    /// Poll the uploaded blob until the server has validated it. A blob that
    /// fails validation is deleted before the error is returned.
    fn wait_for_blob(&self, uuid: &str, interval: Duration) -> Result<()> {
        loop {
            match self.blob_state(uuid)? {
                TaskState::Success => return Ok(()),
                TaskState::Failure => {
                    self.delete_blob_best_effort(uuid);
                    return Err(TesseraError::Response(format!(
                        "uploaded blob {} failed server-side validation",
                        uuid
                    )));
                }
                TaskState::Started => thread::sleep(interval),
            }
        }
    }

    fn blob_state(&self, uuid: &str) -> Result<TaskState> {
        let res = self
            .transport
            .get(&format!("{}/blobs/{}", API_PREFIX, uuid), &[])?;
        let state = res
            .get("state")
            .cloned()
            .ok_or_else(|| TesseraError::Response("blob record without a state".to_string()))?;
        serde_json::from_value(state).map_err(Into::into)
    }

    /// Blob cleanup never fails the surrounding operation.
    fn delete_blob_best_effort(&self, uuid: &str) {
        let path = format!("{}/blobs/{}", API_PREFIX, uuid);
        if let Err(err) = self.transport.delete(&path, &[]) {
            warn!(blob_uuid = %uuid, error = %err, "blob cleanup failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_import_options_defaults() {
        let options = ImportOptions::default();
        assert_eq!(options.srid, None);
        assert!(options.dat_fields.is_empty());
        assert_eq!(options.state_check_interval, Duration::from_secs(5));
        assert_eq!(options.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_import_options_builders() {
        let options = ImportOptions::new()
            .with_srid(4326)
            .with_dat_fields(vec!["name".to_string()])
            .with_state_check_interval(Duration::from_millis(100))
            .with_poll_interval(Duration::from_millis(200));
        assert_eq!(options.srid, Some(4326));
        assert_eq!(options.dat_fields, vec!["name".to_string()]);
        assert_eq!(options.state_check_interval, Duration::from_millis(100));
        assert_eq!(options.poll_interval, Duration::from_millis(200));
    }

    #[test]
    fn test_delete_stats_deserialize() {
        let stats: DeleteStats =
            serde_json::from_value(json!({"num_features": 2, "num_points": 12})).unwrap();
        assert_eq!(stats.num_features, 2);
        assert_eq!(stats.num_points, 12);
    }
}

// [libs/infra/store/src/repositories/target_repository.rs]
//! Target CRUD. `list_enabled_for_instance` feeds the scheduler's probe
//! fan-out ("enabled Targets... ordered by targetId").

use libsql::params;
use monitor_domain_models::Target;
use tracing::instrument;

use crate::client::StoreClient;
use crate::errors::StoreError;

#[derive(Clone)]
pub struct TargetRepository {
    client: StoreClient,
}

impl TargetRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self))]
    pub async fn list_enabled_for_instance(&self, instance_id: &str) -> Result<Vec<Target>, StoreError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT target_id, instance_id, url, enabled, http_expected_status_min,
                        http_expected_status_max, login_rule
                 FROM targets WHERE instance_id = ?1 AND enabled = 1 ORDER BY target_id",
                params![instance_id],
            )
            .await?;

        let mut targets = Vec::new();
        while let Some(row) = rows.next().await? {
            targets.push(map_row(&row)?);
        }
        Ok(targets)
    }

    /// All targets for an instance regardless of `enabled`, for the Alert
    /// Evaluator's per-tick walk — a `TargetState` outlives its target
    /// being disabled, so the evaluator needs the url even then.
    #[instrument(skip(self))]
    pub async fn list_all_for_instance(&self, instance_id: &str) -> Result<Vec<Target>, StoreError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT target_id, instance_id, url, enabled, http_expected_status_min,
                        http_expected_status_max, login_rule
                 FROM targets WHERE instance_id = ?1 ORDER BY target_id",
                params![instance_id],
            )
            .await?;

        let mut targets = Vec::new();
        while let Some(row) = rows.next().await? {
            targets.push(map_row(&row)?);
        }
        Ok(targets)
    }

    #[instrument(skip(self))]
    pub async fn insert(&self, target: &Target) -> Result<i64, StoreError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                "INSERT INTO targets (instance_id, url, enabled, http_expected_status_min,
                                       http_expected_status_max, login_rule)
                 VALUES (?1,?2,?3,?4,?5,?6)",
                params![
                    target.instance_id.clone(),
                    target.url.clone(),
                    target.enabled as i64,
                    target.http_expected_status_min,
                    target.http_expected_status_max,
                    target.login_rule.clone(),
                ],
            )
            .await
            .map_err(StoreError::from_libsql)?;
        Ok(connection.last_insert_rowid())
    }
}

fn map_row(row: &libsql::Row) -> Result<Target, StoreError> {
    Ok(Target {
        target_id: row.get(0)?,
        instance_id: row.get(1)?,
        url: row.get(2)?,
        enabled: row.get::<i64>(3)? != 0,
        http_expected_status_min: row.get::<i64>(4)? as u16,
        http_expected_status_max: row.get::<i64>(5)? as u16,
        login_rule: row.get(6)?,
    })
}

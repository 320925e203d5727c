use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use courtside_types::{
    events::{EventId, MatchId, NewEvent, PlayerId, RecordedEvent, StoreChange},
    roster::{
        MatchInfo, MatchPatch, MatchPlayerName, MatchStatus, NewMatch, NewPlayer, Player,
        PlayerPatch,
    },
    CourtsideError, Result,
};
use fs2::FileExt;
use tokio::{fs, sync::Mutex, task};
use tracing::{debug, info, warn};

use crate::{ChangeFeed, Dataset, EventStore, RosterAdmin, RosterSource, Subscription};

/// Single json document on disk, shareable between processes.
///
/// Reads always go to the file. Every mutation takes an exclusive lock on a
/// sibling `.lock` file, re-reads the document, applies the change and
/// replaces the file before it is acknowledged. A failed write leaves the
/// file as it was.
#[derive(Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    writer: Arc<Mutex<()>>,
    feed: ChangeFeed,
}

/// Held for the duration of one read-modify-write.
struct FileLock(File);

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.0) {
            warn!("failed to release data file lock: {err}");
        }
    }
}

impl JsonFileStore {
    pub async fn open<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            writer: Arc::new(Mutex::new(())),
            feed: ChangeFeed::new(capacity),
        };
        let dataset = store.load().await?;
        info!(
            players = dataset.players.len(),
            matches = dataset.matches.len(),
            events = dataset.events.len(),
            "Opened data file {}",
            store.path.display()
        );
        Ok(store)
    }

    async fn load(&self) -> Result<Dataset> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => serde_json::from_str(&contents).map_err(|err| {
                CourtsideError::store(format!("corrupt data file {}: {err}", self.path.display()))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("Data file {} not found; starting empty", self.path.display());
                Ok(Dataset::default())
            }
            Err(err) => Err(CourtsideError::store(format!(
                "unable to read data file {}: {err}",
                self.path.display()
            ))),
        }
    }

    /// Applies `op` to a fresh copy of the document under the file lock and
    /// writes the result back. Nothing is written when `op` fails.
    async fn transact<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Dataset) -> Result<T> + Send,
        T: Send,
    {
        let _local = self.writer.lock().await;
        let _lock = self.lock().await?;
        let mut dataset = self.load().await?;
        let out = op(&mut dataset)?;
        self.persist(&dataset).await?;
        Ok(out)
    }

    async fn lock(&self) -> Result<FileLock> {
        self.ensure_parent().await?;
        let lock_path = self.path.with_extension("json.lock");
        let display = lock_path.display().to_string();
        let file = task::spawn_blocking(move || -> std::io::Result<File> {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&lock_path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|err| CourtsideError::store(format!("lock task failed: {err}")))?
        .map_err(|err| CourtsideError::store(format!("failed to lock {display}: {err}")))?;
        Ok(FileLock(file))
    }

    async fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|err| {
                CourtsideError::store(format!("failed to create {}: {err}", parent.display()))
            })?;
        }
        Ok(())
    }

    async fn persist(&self, dataset: &Dataset) -> Result<()> {
        let doc = serde_json::to_string_pretty(dataset)
            .map_err(|err| CourtsideError::store(format!("failed to encode dataset: {err}")))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, doc).await.map_err(|err| {
            CourtsideError::store(format!("failed to write {}: {err}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.path).await.map_err(|err| {
            CourtsideError::store(format!("failed to replace {}: {err}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), "dataset persisted");
        Ok(())
    }
}

#[async_trait]
impl EventStore for JsonFileStore {
    async fn append(&self, event: NewEvent) -> Result<RecordedEvent> {
        let recorded = self
            .transact(move |data| data.append(event))
            .await
            .map_err(|err| {
                warn!("append not persisted: {err}");
                err
            })?;
        self.feed.publish(StoreChange::appended(&recorded));
        Ok(recorded)
    }

    async fn delete_by_id(&self, id: EventId) -> Result<()> {
        let removed = self
            .transact(move |data| data.remove(id))
            .await
            .map_err(|err| {
                warn!(event_id = %id, "delete not persisted: {err}");
                err
            })?;
        self.feed.publish(StoreChange::deleted(&removed));
        Ok(())
    }

    async fn list(&self, match_id: MatchId) -> Result<Vec<RecordedEvent>> {
        Ok(self.load().await?.list(match_id))
    }

    async fn list_all(&self) -> Result<Vec<RecordedEvent>> {
        Ok(self.load().await?.list_all())
    }

    fn subscribe(&self, match_id: MatchId) -> Subscription {
        self.feed.subscribe(match_id)
    }
}

#[async_trait]
impl RosterSource for JsonFileStore {
    async fn players(&self) -> Result<Vec<Player>> {
        Ok(self.load().await?.players)
    }

    async fn player(&self, id: PlayerId) -> Result<Player> {
        self.load().await?.player(id)
    }

    async fn matches(&self) -> Result<Vec<MatchInfo>> {
        Ok(self.load().await?.matches)
    }

    async fn match_info(&self, id: MatchId) -> Result<MatchInfo> {
        self.load().await?.match_info(id)
    }
}

#[async_trait]
impl RosterAdmin for JsonFileStore {
    async fn add_player(&self, player: NewPlayer) -> Result<Player> {
        let player = player.into_player()?;
        let row = player.clone();
        self.transact(move |data| {
            data.insert_player(row);
            Ok(())
        })
        .await?;
        Ok(player)
    }

    async fn update_player(&self, id: PlayerId, patch: PlayerPatch) -> Result<Player> {
        self.transact(move |data| data.update_player(id, patch)).await
    }

    async fn set_player_active(&self, id: PlayerId, active: bool) -> Result<Player> {
        self.transact(move |data| data.set_player_active(id, active)).await
    }

    async fn remove_player(&self, id: PlayerId) -> Result<()> {
        self.transact(move |data| data.remove_player(id).map(|_| ())).await
    }

    async fn add_match(&self, info: NewMatch) -> Result<MatchInfo> {
        let info = info.into_match()?;
        let row = info.clone();
        self.transact(move |data| data.insert_match(row)).await?;
        Ok(info)
    }

    async fn update_match(&self, id: MatchId, patch: MatchPatch) -> Result<MatchInfo> {
        self.transact(move |data| data.update_match(id, patch)).await
    }

    async fn set_match_status(&self, id: MatchId, status: MatchStatus) -> Result<MatchInfo> {
        self.transact(move |data| data.set_match_status(id, status)).await
    }

    async fn remove_match(&self, id: MatchId) -> Result<()> {
        let removed = self.transact(move |data| data.remove_match(id)).await?;
        for event in &removed {
            self.feed.publish(StoreChange::deleted(event));
        }
        Ok(())
    }

    async fn add_to_roster(&self, match_id: MatchId, player_id: PlayerId) -> Result<MatchInfo> {
        self.transact(move |data| data.add_to_roster(match_id, player_id)).await
    }

    async fn remove_from_roster(
        &self,
        match_id: MatchId,
        player_id: PlayerId,
    ) -> Result<MatchInfo> {
        self.transact(move |data| data.remove_from_roster(match_id, player_id)).await
    }

    async fn set_match_name(&self, match_id: MatchId, name: MatchPlayerName) -> Result<()> {
        self.transact(move |data| data.set_match_name(match_id, name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_types::metrics::Metric;
    use uuid::Uuid;

    /// Fresh directory holding `season.json`; removed by the caller.
    fn temp_store_path(tag: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("courtside-{tag}-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("season.json");
        (dir, path)
    }

    async fn seeded(path: &Path) -> (JsonFileStore, Player, MatchInfo) {
        let store = JsonFileStore::open(path, 8).await.expect("open");
        let ana = store
            .add_player(NewPlayer {
                name: "Ana".into(),
                ..Default::default()
            })
            .await
            .expect("player");
        let info = store.add_match(NewMatch::default()).await.expect("match");
        (store, ana, info)
    }

    #[tokio::test]
    async fn events_survive_reopen() {
        let (dir, path) = temp_store_path("reopen");
        let (store, ana, info) = seeded(&path).await;
        let kept = store
            .append(NewEvent::new(info.id, ana.id, 1, 0, Metric::Serve))
            .await
            .expect("append");
        let dropped = store
            .append(NewEvent::new(info.id, ana.id, 1, 1, Metric::ServeError))
            .await
            .expect("append");
        store.delete_by_id(dropped.id).await.expect("delete");

        let reopened = JsonFileStore::open(&path, 8).await.expect("reopen");
        let events = reopened.list(info.id).await.expect("list");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, kept.id);
        assert_eq!(reopened.player(ana.id).await.expect("player").name, "Ana");

        std::fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[tokio::test]
    async fn two_writers_on_one_file_keep_every_event() {
        let (dir, path) = temp_store_path("writers");
        let (first, ana, info) = seeded(&path).await;
        let second = JsonFileStore::open(&path, 8).await.expect("second handle");

        first
            .append(NewEvent::new(info.id, ana.id, 1, 0, Metric::Serve))
            .await
            .expect("first append");
        second
            .append(NewEvent::new(info.id, ana.id, 1, 1, Metric::Block))
            .await
            .expect("second append");
        // Roster edits from another handle must not clobber events either.
        second
            .set_match_status(info.id, MatchStatus::InProgress)
            .await
            .expect("status");

        let codes: Vec<String> = JsonFileStore::open(&path, 8)
            .await
            .expect("reopen")
            .list(info.id)
            .await
            .expect("list")
            .into_iter()
            .map(|e| e.metric_code)
            .collect();
        assert_eq!(codes, vec!["S".to_string(), "B".to_string()]);
        assert_eq!(first.list(info.id).await.expect("fresh read").len(), 2);
        assert_eq!(
            first.match_info(info.id).await.expect("match").status,
            MatchStatus::InProgress
        );

        std::fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[tokio::test]
    async fn failed_writes_leave_the_file_untouched() {
        let (dir, path) = temp_store_path("failing");
        let (store, ana, info) = seeded(&path).await;
        let first = store
            .append(NewEvent::new(info.id, ana.id, 1, 0, Metric::Serve))
            .await
            .expect("append");
        let second = store
            .append(NewEvent::new(info.id, ana.id, 1, 1, Metric::Block))
            .await
            .expect("append");

        // A directory squatting on the temp name makes every write fail.
        let blocker = path.with_extension("json.tmp");
        std::fs::create_dir(&blocker).expect("block writes");

        let err = store
            .append(NewEvent::new(info.id, ana.id, 1, 2, Metric::AttackError))
            .await
            .unwrap_err();
        assert!(matches!(err, CourtsideError::StoreUnavailable(_)));

        let err = store.delete_by_id(first.id).await.unwrap_err();
        assert!(matches!(err, CourtsideError::StoreUnavailable(_)));

        let ids: Vec<_> = store
            .list(info.id)
            .await
            .expect("list")
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);

        std::fs::remove_dir(&blocker).expect("unblock");
        store.delete_by_id(second.id).await.expect("retry");
        let ids: Vec<_> = store
            .list(info.id)
            .await
            .expect("list")
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![first.id]);

        std::fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[tokio::test]
    async fn missing_file_opens_empty() {
        let (dir, path) = temp_store_path("missing");
        let store = JsonFileStore::open(&path, 8).await.expect("open");
        assert!(store.list_all().await.expect("list").is_empty());
        assert!(!path.exists());
        std::fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[tokio::test]
    async fn corrupt_file_is_store_unavailable() {
        let (dir, path) = temp_store_path("corrupt");
        std::fs::write(&path, "{ not json").expect("write");
        let err = JsonFileStore::open(&path, 8).await.err().expect("corrupt file");
        assert!(matches!(err, CourtsideError::StoreUnavailable(_)));
        std::fs::remove_dir_all(&dir).expect("cleanup");
    }
}

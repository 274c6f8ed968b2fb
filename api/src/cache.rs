//! 进程内 TTL 缓存
//!
//! 每个条目记录写入时间和自己的 TTL，读取时惰性过期：读到过期条目就删除并返回 None，
//! 没有后台清理任务。容量不设上限，条目数量只取决于请求参数组合的数量。

use {
	chrono::Utc,
	dashmap::DashMap,
	std::{
		sync::{
			Arc,
			atomic::{AtomicI64, Ordering},
		},
		time::Duration,
	},
};

/// 毫秒时间源，测试里用 [`ManualClock`] 控制时间
pub trait Clock: Send + Sync {
	fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now_ms(&self) -> i64 {
		Utc::now().timestamp_millis()
	}
}

/// 手动推进的时钟，可以回拨
#[derive(Debug, Default)]
pub struct ManualClock {
	now_ms: AtomicI64,
}

impl ManualClock {
	pub fn new(start_ms: i64) -> Self {
		Self { now_ms: AtomicI64::new(start_ms) }
	}

	pub fn set(&self, now_ms: i64) {
		self.now_ms.store(now_ms, Ordering::SeqCst);
	}

	pub fn advance(&self, by: Duration) {
		self.now_ms.fetch_add(duration_ms(by) as i64, Ordering::SeqCst);
	}
}

impl Clock for ManualClock {
	fn now_ms(&self) -> i64 {
		self.now_ms.load(Ordering::SeqCst)
	}
}

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
	pub value: V,
	/// 写入时间（毫秒）
	pub stored_at: i64,
	pub ttl_ms: u64,
}

impl<V> CacheEntry<V> {
	pub fn expires_at(&self) -> i64 {
		self.stored_at.saturating_add(i64::try_from(self.ttl_ms).unwrap_or(i64::MAX))
	}

	/// 严格早于过期时间才可读
	pub fn is_live(&self, now_ms: i64) -> bool {
		now_ms < self.expires_at()
	}
}

pub struct TtlCache<V> {
	entries: DashMap<String, CacheEntry<V>>,
	default_ttl_ms: u64,
	clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
	pub fn new(default_ttl: Duration) -> Self {
		Self::with_clock(default_ttl, Arc::new(SystemClock))
	}

	pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
		Self { entries: DashMap::new(), default_ttl_ms: duration_ms(default_ttl), clock }
	}

	/// 命中返回值的副本；过期条目在这里被删除
	pub fn get(&self, key: &str) -> Option<V> {
		let now = self.clock.now_ms();
		{
			let entry = self.entries.get(key)?;
			if entry.is_live(now) {
				return Some(entry.value.clone());
			}
		}
		// 读锁必须先释放，否则 remove 会在同一个 shard 上死锁
		// 只删除仍然过期的条目，并发 set 写入的新值保留
		self.entries.remove_if(key, |_, entry| !entry.is_live(now));
		None
	}

	pub fn set(&self, key: impl Into<String>, value: V) {
		self.insert(key.into(), value, self.default_ttl_ms);
	}

	pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
		self.insert(key.into(), value, duration_ms(ttl));
	}

	pub fn clear(&self) {
		self.entries.clear();
	}

	/// 包含尚未被读到的过期条目
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn default_ttl_ms(&self) -> u64 {
		self.default_ttl_ms
	}

	fn insert(&self, key: String, value: V, ttl_ms: u64) {
		let entry = CacheEntry { value, stored_at: self.clock.now_ms(), ttl_ms };
		self.entries.insert(key, entry);
	}
}

fn duration_ms(duration: Duration) -> u64 {
	u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

//! 关联缓存
//!
//! 以关联ID为键保存进行中的交换，容量固定，超出时淘汰最久未访问的条目。
//! 被淘汰的交换之后到达的响应会找不到对应请求，这是负载下的正常现象。

use std::collections::{BTreeMap, HashMap};

use crate::errors::Error;

struct Slot<V> {
    value: V,
    // 最近一次插入或访问的序号
    tick: u64,
}

pub struct CorrelationCache<V> {
    capacity: usize,
    entries: HashMap<String, Slot<V>>,
    // 访问序号 -> 键，最小的序号即最久未访问
    recency: BTreeMap<u64, String>,
    next_tick: u64,
    evictions: u64,
}

impl<V> CorrelationCache<V> {
    pub fn new(capacity: usize) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::Config("cache capacity must be at least 1".to_string()));
        }
        Ok(Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            recency: BTreeMap::new(),
            next_tick: 0,
            evictions: 0,
        })
    }

    /// 插入或覆盖，同一个键只保留最新的值
    ///
    /// 新键导致超出容量时返回被淘汰的条目。
    pub fn put(&mut self, id: String, value: V) -> Option<(String, V)> {
        let tick = self.bump();
        if let Some(slot) = self.entries.get_mut(&id) {
            self.recency.remove(&slot.tick);
            slot.value = value;
            slot.tick = tick;
            self.recency.insert(tick, id);
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict_lru()
        } else {
            None
        };

        self.recency.insert(tick, id.clone());
        self.entries.insert(id, Slot { value, tick });
        evicted
    }

    pub fn get(&mut self, id: &str) -> Option<&V> {
        self.touch(id)?;
        self.entries.get(id).map(|slot| &slot.value)
    }

    /// 原地修改，键不存在时不做任何事
    pub fn update<F, R>(&mut self, id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut V) -> R,
    {
        self.touch(id)?;
        self.entries.get_mut(id).map(|slot| f(&mut slot.value))
    }

    pub fn remove(&mut self, id: &str) -> Option<V> {
        let slot = self.entries.remove(id)?;
        self.recency.remove(&slot.tick);
        Some(slot.value)
    }

    /// 不刷新访问顺序
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    fn bump(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    fn touch(&mut self, id: &str) -> Option<()> {
        if !self.entries.contains_key(id) {
            return None;
        }
        let tick = self.bump();
        let slot = self.entries.get_mut(id)?;
        let key = self.recency.remove(&slot.tick)?;
        slot.tick = tick;
        self.recency.insert(tick, key);
        Some(())
    }

    fn evict_lru(&mut self) -> Option<(String, V)> {
        let (_, id) = self.recency.pop_first()?;
        let slot = self.entries.remove(&id)?;
        self.evictions += 1;
        Some((id, slot.value))
    }
}

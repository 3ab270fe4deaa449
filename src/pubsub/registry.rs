use std::{collections::HashMap, sync::Arc};

use tokio::sync::mpsc;

use super::{subscription::SubscriptionState, SubscriptionId};

/// Запись активного подписчика в реестре.
pub(crate) struct Entry<T> {
    pub id: SubscriptionId,
    pub sender: mpsc::Sender<T>,
    pub state: Arc<SubscriptionState>,
}

/// Субъект → упорядоченный список активных подписчиков, плюс флаг закрытия.
///
/// Пустые списки из карты удаляются. Один и тот же субъект может иметь
/// несколько подписок с одинаковым обработчиком, различаются они только по id.
pub(crate) struct Registry<T> {
    subjects: HashMap<Arc<str>, Vec<Entry<T>>>,
    closed: bool,
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            subjects: HashMap::new(),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn mark_closed(&mut self) {
        self.closed = true;
    }

    /// Возвращает уже существующий ключ субъекта или создаёт новый.
    pub fn intern(
        &self,
        subject: &str,
    ) -> Arc<str> {
        match self.subjects.get_key_value(subject) {
            Some((key, _)) => Arc::clone(key),
            None => Arc::from(subject),
        }
    }

    pub fn insert(
        &mut self,
        subject: Arc<str>,
        entry: Entry<T>,
    ) {
        self.subjects.entry(subject).or_default().push(entry);
    }

    /// Удаляет подписку `id` из субъекта, сохраняя порядок остальных.
    pub fn remove(
        &mut self,
        subject: &str,
        id: SubscriptionId,
    ) -> Option<Entry<T>> {
        let entries = self.subjects.get_mut(subject)?;
        let pos = entries.iter().position(|e| e.id == id)?;
        let entry = entries.remove(pos);
        if entries.is_empty() {
            self.subjects.remove(subject);
        }
        Some(entry)
    }

    pub fn subscribers(
        &self,
        subject: &str,
    ) -> &[Entry<T>] {
        self.subjects.get(subject).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    /// Забирает все записи, оставляя реестр пустым.
    pub fn drain_all(&mut self) -> Vec<Entry<T>> {
        self.subjects.drain().flat_map(|(_, v)| v).collect()
    }
}

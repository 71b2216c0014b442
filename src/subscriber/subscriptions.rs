use std::collections::HashSet;

use crate::types::constants::PRESENCE_SUFFIX;

/// Whether `name` follows the presence-channel naming convention.
pub fn is_presence_name(name: &str) -> bool {
    name.ends_with(PRESENCE_SUFFIX)
}

/// Presence companion name for a base channel.
pub fn presence_name(base: &str) -> String {
    format!("{base}{PRESENCE_SUFFIX}")
}

/// Base channel name with any presence suffix stripped.
pub fn base_name(name: &str) -> &str {
    name.strip_suffix(PRESENCE_SUFFIX).unwrap_or(name)
}

/// Membership the subscribe loop listens on: regular channels, channel
/// groups, and presence-only channels.
///
/// Presence-only names are kept apart from regular channels; mixed input to
/// [`add_channels`](Self::add_channels) is split on the suffix convention, so
/// the two sets never intersect.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionSet {
    channels: HashSet<String>,
    channel_groups: HashSet<String>,
    presence_channels: HashSet<String>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds channel names, routing presence-suffixed entries to the
    /// presence set.
    pub fn add_channels<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if is_presence_name(&name) {
                self.presence_channels.insert(name);
            } else {
                self.channels.insert(name);
            }
        }
    }

    /// Removes the given names from both the channel and the presence set.
    pub fn remove_channels<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            self.channels.remove(name);
            self.presence_channels.remove(name);
        }
    }

    pub fn add_channel_groups<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.channel_groups.insert(name.into());
        }
    }

    pub fn remove_channel_groups<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.channel_groups.remove(name.as_ref());
        }
    }

    /// Adds presence-only subscriptions; bare base names are suffixed.
    pub fn add_presence_channels<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if is_presence_name(&name) {
                self.presence_channels.insert(name);
            } else {
                self.presence_channels.insert(presence_name(&name));
            }
        }
    }

    pub fn remove_presence_channels<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            if is_presence_name(name) {
                self.presence_channels.remove(name);
            } else {
                self.presence_channels.remove(&presence_name(name));
            }
        }
    }

    pub fn channels(&self) -> Vec<String> {
        sorted(&self.channels)
    }

    pub fn channel_groups(&self) -> Vec<String> {
        sorted(&self.channel_groups)
    }

    pub fn presence_channels(&self) -> Vec<String> {
        sorted(&self.presence_channels)
    }

    /// Channel names for the subscribe path: regular channels followed by
    /// presence companions.
    pub fn subscribe_names(&self) -> Vec<String> {
        let mut names = self.channels();
        names.extend(self.presence_channels());
        names
    }

    /// Every subscribed object: channels, presence companions, then groups.
    pub fn all(&self) -> Vec<String> {
        let mut names = self.subscribe_names();
        names.extend(self.channel_groups());
        names
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
            && self.channel_groups.is_empty()
            && self.presence_channels.is_empty()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
        self.channel_groups.clear();
        self.presence_channels.clear();
    }
}

fn sorted(set: &HashSet<String>) -> Vec<String> {
    let mut names: Vec<String> = set.iter().cloned().collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_channels_splits_on_presence_suffix() {
        let mut set = SubscriptionSet::new();
        set.add_channels(["a", "b-pnpres", "c"]);

        assert_eq!(set.channels(), vec!["a", "c"]);
        assert_eq!(set.presence_channels(), vec!["b-pnpres"]);
    }

    #[test]
    fn test_channels_and_presence_stay_disjoint() {
        let mut set = SubscriptionSet::new();
        set.add_channels(["a", "a-pnpres"]);
        set.add_presence_channels(["a"]);

        let channels: HashSet<String> = set.channels().into_iter().collect();
        let presence: HashSet<String> = set.presence_channels().into_iter().collect();
        assert!(channels.is_disjoint(&presence));
    }

    #[test]
    fn test_remove_channels_strips_both_sets_by_name() {
        let mut set = SubscriptionSet::new();
        set.add_channels(["a", "a-pnpres", "b"]);

        set.remove_channels(["a-pnpres"]);
        assert_eq!(set.channels(), vec!["a", "b"]);
        assert!(set.presence_channels().is_empty());

        set.remove_channels(["a"]);
        assert_eq!(set.channels(), vec!["b"]);
    }

    #[test]
    fn test_add_remove_round_trip_leaves_set_unchanged() {
        let mut set = SubscriptionSet::new();
        set.add_channels(["keep"]);
        let before = set.all();

        set.add_channels(["x", "x-pnpres"]);
        set.add_channel_groups(["g"]);
        set.remove_channels(["x", "x-pnpres"]);
        set.remove_channel_groups(["g"]);

        assert_eq!(set.all(), before);
    }

    #[test]
    fn test_presence_channels_normalize_bare_names() {
        let mut set = SubscriptionSet::new();
        set.add_presence_channels(["a", "b-pnpres"]);
        assert_eq!(set.presence_channels(), vec!["a-pnpres", "b-pnpres"]);

        set.remove_presence_channels(["a"]);
        assert_eq!(set.presence_channels(), vec!["b-pnpres"]);
    }

    #[test]
    fn test_snapshots_are_stable_copies() {
        let mut set = SubscriptionSet::new();
        set.add_channels(["a"]);

        let snapshot = set.channels();
        set.add_channels(["b"]);
        assert_eq!(snapshot, vec!["a"]);
    }

    #[test]
    fn test_subscribe_names_order_channels_before_presence() {
        let mut set = SubscriptionSet::new();
        set.add_channels(["z", "a-pnpres"]);
        set.add_channel_groups(["g"]);

        assert_eq!(set.subscribe_names(), vec!["z", "a-pnpres"]);
        assert_eq!(set.all(), vec!["z", "a-pnpres", "g"]);
    }

    #[test]
    fn test_name_helpers() {
        assert!(is_presence_name("a-pnpres"));
        assert!(!is_presence_name("a"));
        assert_eq!(presence_name("a"), "a-pnpres");
        assert_eq!(base_name("a-pnpres"), "a");
        assert_eq!(base_name("a"), "a");
    }
}

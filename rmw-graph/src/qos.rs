use std::fmt;

use crate::entity::EndpointInfo;

#[derive(Debug, Default, Hash, PartialEq, Eq, Clone, Copy)]
pub enum ReliabilityPolicy {
    SystemDefault,
    #[default]
    Reliable,
    BestEffort,
    /// Placeholder resolved at discovery time, see the best-available helpers.
    BestAvailable,
    Unknown,
}

impl fmt::Display for ReliabilityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemDefault => write!(f, "System Default"),
            Self::Reliable => write!(f, "Reliable"),
            Self::BestEffort => write!(f, "Best Effort"),
            Self::BestAvailable => write!(f, "Best Available"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Default, Hash, PartialEq, Eq, Clone, Copy)]
pub enum DurabilityPolicy {
    SystemDefault,
    TransientLocal,
    #[default]
    Volatile,
    BestAvailable,
    Unknown,
}

impl fmt::Display for DurabilityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemDefault => write!(f, "System Default"),
            Self::TransientLocal => write!(f, "Transient Local"),
            Self::Volatile => write!(f, "Volatile"),
            Self::BestAvailable => write!(f, "Best Available"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Default, Hash, PartialEq, Eq, Clone, Copy)]
pub enum HistoryPolicy {
    SystemDefault,
    #[default]
    KeepLast,
    KeepAll,
    Unknown,
}

impl fmt::Display for HistoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemDefault => write!(f, "System Default"),
            Self::KeepLast => write!(f, "Keep Last"),
            Self::KeepAll => write!(f, "Keep All"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Default, Hash, PartialEq, Eq, Clone, Copy)]
pub enum LivelinessPolicy {
    SystemDefault,
    #[default]
    Automatic,
    ManualByTopic,
    BestAvailable,
    Unknown,
}

impl fmt::Display for LivelinessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemDefault => write!(f, "System Default"),
            Self::Automatic => write!(f, "Automatic"),
            Self::ManualByTopic => write!(f, "Manual by Topic"),
            Self::BestAvailable => write!(f, "Best Available"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A duration in seconds and nanoseconds, ordered lexicographically on
/// the (sec, nsec) pair.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct Duration {
    pub sec: u64,
    pub nsec: u64,
}

impl Duration {
    pub const INFINITE: Duration = Duration {
        sec: 9223372036,
        nsec: 854775807,
    };

    /// The unset/default duration, treated as infinite.
    pub const DEFAULT: Duration = Duration::INFINITE;

    /// Sentinel requesting discovery-time resolution of the duration.
    pub const BEST_AVAILABLE: Duration = Duration {
        sec: 9223372036,
        nsec: 854775806,
    };

    pub const ZERO: Duration = Duration { sec: 0, nsec: 0 };

    pub const fn new(sec: u64, nsec: u64) -> Self {
        Self { sec, nsec }
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::INFINITE
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INFINITE {
            write!(f, "Infinite")
        } else if self.nsec == 0 {
            write!(f, "{}s", self.sec)
        } else {
            write!(f, "{}s {}ns", self.sec, self.nsec)
        }
    }
}

#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub struct QosProfile {
    pub history: HistoryPolicy,
    pub depth: usize,
    pub reliability: ReliabilityPolicy,
    pub durability: DurabilityPolicy,
    pub deadline: Duration,
    pub lifespan: Duration,
    pub liveliness: LivelinessPolicy,
    pub liveliness_lease_duration: Duration,
    pub avoid_ros_namespace_conventions: bool,
}

impl Default for QosProfile {
    fn default() -> Self {
        Self {
            history: HistoryPolicy::KeepLast,
            depth: 10,
            reliability: ReliabilityPolicy::Reliable,
            durability: DurabilityPolicy::Volatile,
            deadline: Duration::DEFAULT,
            lifespan: Duration::DEFAULT,
            liveliness: LivelinessPolicy::Automatic,
            liveliness_lease_duration: Duration::DEFAULT,
            avoid_ros_namespace_conventions: false,
        }
    }
}

/// Default profile applied to service and client endpoints.
pub const QOS_PROFILE_SERVICES_DEFAULT: QosProfile = QosProfile {
    history: HistoryPolicy::KeepLast,
    depth: 10,
    reliability: ReliabilityPolicy::Reliable,
    durability: DurabilityPolicy::Volatile,
    deadline: Duration::DEFAULT,
    lifespan: Duration::DEFAULT,
    liveliness: LivelinessPolicy::SystemDefault,
    liveliness_lease_duration: Duration::DEFAULT,
    avoid_ros_namespace_conventions: false,
};

impl fmt::Display for QosProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QoS({}, {}, {} ({})",
            self.reliability, self.durability, self.history, self.depth
        )?;
        if self.deadline != Duration::INFINITE {
            write!(f, ", deadline={}", self.deadline)?;
        }
        if self.lifespan != Duration::INFINITE {
            write!(f, ", lifespan={}", self.lifespan)?;
        }
        if self.liveliness != LivelinessPolicy::Automatic {
            write!(f, ", liveliness={}", self.liveliness)?;
        }
        if self.liveliness_lease_duration != Duration::INFINITE {
            write!(f, ", lease={}", self.liveliness_lease_duration)?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Default, Hash, PartialEq, Eq, Clone, Copy)]
pub enum QosCompatibility {
    #[default]
    Ok,
    Warning,
    Error,
}

fn reliability_is_unresolved(policy: ReliabilityPolicy) -> bool {
    matches!(
        policy,
        ReliabilityPolicy::SystemDefault | ReliabilityPolicy::Unknown
    )
}

fn durability_is_unresolved(policy: DurabilityPolicy) -> bool {
    matches!(
        policy,
        DurabilityPolicy::SystemDefault | DurabilityPolicy::Unknown
    )
}

fn liveliness_is_unresolved(policy: LivelinessPolicy) -> bool {
    matches!(
        policy,
        LivelinessPolicy::SystemDefault | LivelinessPolicy::Unknown
    )
}

/// Checks whether a publisher and a subscription can communicate given
/// their QoS profiles.
///
/// Every applicable error appends its text to the returned reason;
/// warnings are only evaluated when no error was found.
pub fn qos_profile_check_compatible(
    publisher_qos: QosProfile,
    subscription_qos: QosProfile,
) -> (QosCompatibility, String) {
    let mut compatibility = QosCompatibility::Ok;
    let mut reason = String::new();

    // Best effort publisher and reliable subscription
    if publisher_qos.reliability == ReliabilityPolicy::BestEffort
        && subscription_qos.reliability == ReliabilityPolicy::Reliable
    {
        compatibility = QosCompatibility::Error;
        reason.push_str("ERROR: Best effort publisher and reliable subscription;");
    }

    // Volatile publisher and transient local subscription
    if publisher_qos.durability == DurabilityPolicy::Volatile
        && subscription_qos.durability == DurabilityPolicy::TransientLocal
    {
        compatibility = QosCompatibility::Error;
        reason.push_str("ERROR: Volatile publisher and transient local subscription;");
    }

    let pub_deadline = publisher_qos.deadline;
    let sub_deadline = subscription_qos.deadline;

    // No deadline for publisher and deadline for subscription
    if pub_deadline == Duration::DEFAULT && sub_deadline != Duration::DEFAULT {
        compatibility = QosCompatibility::Error;
        reason.push_str("ERROR: Subscription has a deadline, but publisher does not;");
    }

    // Subscription deadline is less than publisher deadline
    if pub_deadline != Duration::DEFAULT
        && sub_deadline != Duration::DEFAULT
        && sub_deadline < pub_deadline
    {
        compatibility = QosCompatibility::Error;
        reason.push_str("ERROR: Subscription deadline is less than publisher deadline;");
    }

    // Automatic liveliness for publisher and manual by topic for subscription
    if publisher_qos.liveliness == LivelinessPolicy::Automatic
        && subscription_qos.liveliness == LivelinessPolicy::ManualByTopic
    {
        compatibility = QosCompatibility::Error;
        reason
            .push_str("ERROR: Publisher's liveliness is automatic and subscription's is manual by topic;");
    }

    let pub_lease = publisher_qos.liveliness_lease_duration;
    let sub_lease = subscription_qos.liveliness_lease_duration;

    // No lease duration for publisher and lease duration for subscription
    if pub_lease == Duration::DEFAULT && sub_lease != Duration::DEFAULT {
        compatibility = QosCompatibility::Error;
        reason.push_str("ERROR: Subscription has a liveliness lease duration, but publisher does not;");
    }

    // Subscription lease duration is less than publisher lease duration
    if pub_lease != Duration::DEFAULT && sub_lease != Duration::DEFAULT && sub_lease < pub_lease {
        compatibility = QosCompatibility::Error;
        reason.push_str("ERROR: Subscription liveliness lease duration is less than publisher;");
    }

    // Only check for warnings if there are no errors
    if compatibility == QosCompatibility::Ok {
        let pub_reliability_unresolved = reliability_is_unresolved(publisher_qos.reliability);
        let sub_reliability_unresolved = reliability_is_unresolved(subscription_qos.reliability);
        let pub_durability_unresolved = durability_is_unresolved(publisher_qos.durability);
        let sub_durability_unresolved = durability_is_unresolved(subscription_qos.durability);
        let pub_liveliness_unresolved = liveliness_is_unresolved(publisher_qos.liveliness);
        let sub_liveliness_unresolved = liveliness_is_unresolved(subscription_qos.liveliness);

        if pub_reliability_unresolved && sub_reliability_unresolved {
            compatibility = QosCompatibility::Warning;
            reason.push_str(&format!(
                "WARNING: Publisher reliability is {} and subscription reliability is {};",
                publisher_qos.reliability, subscription_qos.reliability
            ));
        } else if pub_reliability_unresolved
            && subscription_qos.reliability == ReliabilityPolicy::Reliable
        {
            compatibility = QosCompatibility::Warning;
            reason.push_str(&format!(
                "WARNING: Reliable subscription, but publisher is {};",
                publisher_qos.reliability
            ));
        } else if publisher_qos.reliability == ReliabilityPolicy::BestEffort
            && sub_reliability_unresolved
        {
            compatibility = QosCompatibility::Warning;
            reason.push_str(&format!(
                "WARNING: Best effort publisher, but subscription is {};",
                subscription_qos.reliability
            ));
        }

        if pub_durability_unresolved && sub_durability_unresolved {
            compatibility = QosCompatibility::Warning;
            reason.push_str(&format!(
                "WARNING: Publisher durability is {} and subscription durability is {};",
                publisher_qos.durability, subscription_qos.durability
            ));
        } else if pub_durability_unresolved
            && subscription_qos.durability == DurabilityPolicy::TransientLocal
        {
            compatibility = QosCompatibility::Warning;
            reason.push_str(&format!(
                "WARNING: Transient local subscription, but publisher is {};",
                publisher_qos.durability
            ));
        } else if publisher_qos.durability == DurabilityPolicy::Volatile && sub_durability_unresolved
        {
            compatibility = QosCompatibility::Warning;
            reason.push_str(&format!(
                "WARNING: Volatile publisher, but subscription is {};",
                subscription_qos.durability
            ));
        }

        if pub_liveliness_unresolved && sub_liveliness_unresolved {
            compatibility = QosCompatibility::Warning;
            reason.push_str(&format!(
                "WARNING: Publisher liveliness is {} and subscription liveliness is {};",
                publisher_qos.liveliness, subscription_qos.liveliness
            ));
        } else if pub_liveliness_unresolved
            && subscription_qos.liveliness == LivelinessPolicy::ManualByTopic
        {
            compatibility = QosCompatibility::Warning;
            reason.push_str(&format!(
                "WARNING: Subscription's liveliness is manual by topic, but publisher's is {};",
                publisher_qos.liveliness
            ));
        } else if publisher_qos.liveliness == LivelinessPolicy::Automatic
            && sub_liveliness_unresolved
        {
            compatibility = QosCompatibility::Warning;
            reason.push_str(&format!(
                "WARNING: Publisher's liveliness is automatic, but subscription's is {};",
                subscription_qos.liveliness
            ));
        }
    }

    (compatibility, reason)
}

/// Resolves every best-available policy of a subscription profile against
/// the QoS actually offered by the discovered publishers.
///
/// An empty publisher list is valid and resolves each policy to its most
/// compatible choice.
pub fn qos_profile_get_best_available_for_subscription(
    publishers_info: &[EndpointInfo],
    subscription_profile: &mut QosProfile,
) {
    // Only use "reliable" if all publishers are reliable, only use
    // "transient local" if all publishers are transient local, only use
    // "manual by topic" if all publishers are manual by topic. Durations
    // resolve to the largest non-default value among publishers.
    let mut number_of_reliable = 0usize;
    let mut number_of_transient_local = 0usize;
    let mut number_of_manual_by_topic = 0usize;
    let mut use_default_deadline = true;
    let mut largest_deadline = Duration::ZERO;
    let mut use_default_lease = true;
    let mut largest_lease = Duration::ZERO;
    for info in publishers_info {
        let profile = &info.qos_profile;
        if profile.reliability == ReliabilityPolicy::Reliable {
            number_of_reliable += 1;
        }
        if profile.durability == DurabilityPolicy::TransientLocal {
            number_of_transient_local += 1;
        }
        if profile.liveliness == LivelinessPolicy::ManualByTopic {
            number_of_manual_by_topic += 1;
        }
        if profile.deadline != Duration::DEFAULT {
            use_default_deadline = false;
            if largest_deadline < profile.deadline {
                largest_deadline = profile.deadline;
            }
        }
        if profile.liveliness_lease_duration != Duration::DEFAULT {
            use_default_lease = false;
            if largest_lease < profile.liveliness_lease_duration {
                largest_lease = profile.liveliness_lease_duration;
            }
        }
    }

    if subscription_profile.reliability == ReliabilityPolicy::BestAvailable {
        subscription_profile.reliability = if number_of_reliable == publishers_info.len() {
            ReliabilityPolicy::Reliable
        } else {
            ReliabilityPolicy::BestEffort
        };
    }

    if subscription_profile.durability == DurabilityPolicy::BestAvailable {
        subscription_profile.durability = if number_of_transient_local == publishers_info.len() {
            DurabilityPolicy::TransientLocal
        } else {
            DurabilityPolicy::Volatile
        };
    }

    if subscription_profile.liveliness == LivelinessPolicy::BestAvailable {
        subscription_profile.liveliness = if number_of_manual_by_topic == publishers_info.len() {
            LivelinessPolicy::ManualByTopic
        } else {
            LivelinessPolicy::Automatic
        };
    }

    if subscription_profile.deadline == Duration::BEST_AVAILABLE {
        subscription_profile.deadline = if use_default_deadline {
            Duration::DEFAULT
        } else {
            largest_deadline
        };
    }

    if subscription_profile.liveliness_lease_duration == Duration::BEST_AVAILABLE {
        subscription_profile.liveliness_lease_duration = if use_default_lease {
            Duration::DEFAULT
        } else {
            largest_lease
        };
    }
}

/// Resolves every best-available policy of a publisher profile against
/// the QoS requested by the discovered subscriptions.
pub fn qos_profile_get_best_available_for_publisher(
    subscriptions_info: &[EndpointInfo],
    publisher_profile: &mut QosProfile,
) {
    // Reliable and transient local are compatible with every subscription
    // and offer the highest level of service.
    if publisher_profile.reliability == ReliabilityPolicy::BestAvailable {
        publisher_profile.reliability = ReliabilityPolicy::Reliable;
    }
    if publisher_profile.durability == DurabilityPolicy::BestAvailable {
        publisher_profile.durability = DurabilityPolicy::TransientLocal;
    }

    // Manual by topic wins if at least one subscription requests it.
    // Durations resolve to the smallest non-default value among
    // subscriptions, since the publisher must meet the tightest demand.
    let mut use_manual_by_topic = false;
    let mut use_default_deadline = true;
    let mut smallest_deadline = Duration::INFINITE;
    let mut use_default_lease = true;
    let mut smallest_lease = Duration::INFINITE;
    for info in subscriptions_info {
        let profile = &info.qos_profile;
        if profile.liveliness == LivelinessPolicy::ManualByTopic {
            use_manual_by_topic = true;
        }
        if profile.deadline != Duration::DEFAULT {
            use_default_deadline = false;
            if profile.deadline < smallest_deadline {
                smallest_deadline = profile.deadline;
            }
        }
        if profile.liveliness_lease_duration != Duration::DEFAULT {
            use_default_lease = false;
            if profile.liveliness_lease_duration < smallest_lease {
                smallest_lease = profile.liveliness_lease_duration;
            }
        }
    }

    if publisher_profile.liveliness == LivelinessPolicy::BestAvailable {
        publisher_profile.liveliness = if use_manual_by_topic {
            LivelinessPolicy::ManualByTopic
        } else {
            LivelinessPolicy::Automatic
        };
    }

    if publisher_profile.deadline == Duration::BEST_AVAILABLE {
        publisher_profile.deadline = if use_default_deadline {
            Duration::DEFAULT
        } else {
            smallest_deadline
        };
    }

    if publisher_profile.liveliness_lease_duration == Duration::BEST_AVAILABLE {
        publisher_profile.liveliness_lease_duration = if use_default_lease {
            Duration::DEFAULT
        } else {
            smallest_lease
        };
    }
}

fn qos_profile_has_best_available_policy(qos_profile: &QosProfile) -> bool {
    qos_profile.reliability == ReliabilityPolicy::BestAvailable
        || qos_profile.durability == DurabilityPolicy::BestAvailable
        || qos_profile.liveliness == LivelinessPolicy::BestAvailable
        || qos_profile.deadline == Duration::BEST_AVAILABLE
        || qos_profile.liveliness_lease_duration == Duration::BEST_AVAILABLE
}

/// Resolves best-available policies of a subscription profile for a topic,
/// surveying the discovered publishers through `get_publishers_info` only
/// when the profile actually contains a best-available policy.
pub fn qos_profile_get_best_available_for_topic_subscription<F>(
    topic_name: &str,
    qos_profile: &mut QosProfile,
    get_publishers_info: F,
) -> crate::Result<()>
where
    F: FnOnce(&str) -> crate::Result<Vec<EndpointInfo>>,
{
    if qos_profile_has_best_available_policy(qos_profile) {
        let publishers_info = get_publishers_info(topic_name)?;
        qos_profile_get_best_available_for_subscription(&publishers_info, qos_profile);
    }
    Ok(())
}

/// Symmetric to [`qos_profile_get_best_available_for_topic_subscription`],
/// surveying the discovered subscriptions instead.
pub fn qos_profile_get_best_available_for_topic_publisher<F>(
    topic_name: &str,
    qos_profile: &mut QosProfile,
    get_subscriptions_info: F,
) -> crate::Result<()>
where
    F: FnOnce(&str) -> crate::Result<Vec<EndpointInfo>>,
{
    if qos_profile_has_best_available_policy(qos_profile) {
        let subscriptions_info = get_subscriptions_info(topic_name)?;
        qos_profile_get_best_available_for_publisher(&subscriptions_info, qos_profile);
    }
    Ok(())
}

/// Replaces any best-available policy with the fixed services default.
/// Services do not survey discovered endpoints.
pub fn qos_profile_update_best_available_for_services(qos_profile: &QosProfile) -> QosProfile {
    let mut result = *qos_profile;
    if result.reliability == ReliabilityPolicy::BestAvailable {
        result.reliability = QOS_PROFILE_SERVICES_DEFAULT.reliability;
    }
    if result.durability == DurabilityPolicy::BestAvailable {
        result.durability = QOS_PROFILE_SERVICES_DEFAULT.durability;
    }
    if result.liveliness == LivelinessPolicy::BestAvailable {
        result.liveliness = QOS_PROFILE_SERVICES_DEFAULT.liveliness;
    }
    if result.deadline == Duration::BEST_AVAILABLE {
        result.deadline = QOS_PROFILE_SERVICES_DEFAULT.deadline;
    }
    if result.liveliness_lease_duration == Duration::BEST_AVAILABLE {
        result.liveliness_lease_duration = QOS_PROFILE_SERVICES_DEFAULT.liveliness_lease_duration;
    }
    result
}

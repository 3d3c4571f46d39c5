use super::types::{AccessPolicy, CourseFeatures, CourseType, PricingModel};

/// Membership access is granted in 30 day windows, renewed by the subscription.
const MEMBERSHIP_ACCESS_DAYS: u32 = 30;

impl CourseType {
    /// Default length of the course in days. Memberships and custom courses are open ended.
    pub fn default_duration_days(&self) -> Option<u32> {
        match self {
            CourseType::Sprint => Some(14),
            CourseType::Marathon => Some(90),
            CourseType::Membership | CourseType::Custom => None,
        }
    }

    pub fn default_access(&self) -> AccessPolicy {
        match self {
            CourseType::Membership => AccessPolicy::Limited {
                duration_days: MEMBERSHIP_ACCESS_DAYS,
            },
            _ => AccessPolicy::Lifetime,
        }
    }

    pub fn default_features(&self) -> CourseFeatures {
        match self {
            CourseType::Sprint => CourseFeatures {
                certificate: true,
                downloadable_resources: true,
                assignments: true,
                quizzes: true,
                ..CourseFeatures::default()
            },
            CourseType::Marathon => CourseFeatures {
                certificate: true,
                community: true,
                live_sessions: true,
                downloadable_resources: true,
                assignments: true,
                quizzes: true,
            },
            CourseType::Membership => CourseFeatures {
                community: true,
                live_sessions: true,
                downloadable_resources: true,
                ..CourseFeatures::default()
            },
            CourseType::Custom => CourseFeatures::default(),
        }
    }

    /// Pricing model suggested to creators for this course type. Never enforced.
    pub fn suggested_pricing_model(&self) -> PricingModel {
        match self {
            CourseType::Membership => PricingModel::Subscription,
            _ => PricingModel::OneTime,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(CourseType::Sprint, Some(14), AccessPolicy::Lifetime, PricingModel::OneTime)]
    #[case(CourseType::Marathon, Some(90), AccessPolicy::Lifetime, PricingModel::OneTime)]
    #[case(
        CourseType::Membership,
        None,
        AccessPolicy::Limited { duration_days: 30 },
        PricingModel::Subscription
    )]
    #[case(CourseType::Custom, None, AccessPolicy::Lifetime, PricingModel::OneTime)]
    fn defaults_per_type(
        #[case] course_type: CourseType,
        #[case] duration: Option<u32>,
        #[case] access: AccessPolicy,
        #[case] pricing: PricingModel,
    ) {
        assert_eq!(course_type.default_duration_days(), duration);
        assert_eq!(course_type.default_access(), access);
        assert_eq!(course_type.suggested_pricing_model(), pricing);
    }

    #[test]
    fn marathon_enables_everything() {
        let f = CourseType::Marathon.default_features();
        assert!(f.certificate && f.community && f.live_sessions);
        assert!(f.downloadable_resources && f.assignments && f.quizzes);
    }

    #[test]
    fn custom_enables_nothing() {
        assert_eq!(CourseType::Custom.default_features(), CourseFeatures::default());
    }
}

use std::borrow::Cow;

pub type Labels = Vec<MetricLabel>;

#[derive(PartialOrd, Ord, PartialEq, Eq, Clone, Debug)]
pub struct MetricLabel {
    pub key: &'static str,
    pub value: Cow<'static, str>,
}

impl MetricLabel {
    pub const STATUS_ERROR: MetricLabel = MetricLabel {
        key: "status",
        value: Cow::Borrowed("error"),
    };
    pub const STATUS_SUCCESS: MetricLabel = MetricLabel {
        key: "status",
        value: Cow::Borrowed("success"),
    };

    pub fn new(key: &'static str, value: impl Into<Cow<'static, str>>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    pub const fn new_const(key: &'static str, value: &'static str) -> Self {
        Self {
            key,
            value: Cow::Borrowed(value),
        }
    }

    pub fn split_key_value(&self) -> (&str, &str) {
        (self.key, &self.value)
    }
}

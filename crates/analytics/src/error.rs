use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Not enough data for {metric}: needs {required} observations, have {available}")]
    InsufficientData {
        metric: String,
        required: usize,
        available: usize,
    },

    #[error("Calculation error: Division by zero encountered in metric '{0}'")]
    DivisionByZero(String),

    #[error("Invalid analysis parameter: {0}")]
    InvalidParameter(String),

    #[error("The aligned dataset is empty")]
    EmptyDataset,
}

impl AnalyticsError {
    pub fn insufficient(metric: impl Into<String>, required: usize, available: usize) -> Self {
        AnalyticsError::InsufficientData {
            metric: metric.into(),
            required,
            available,
        }
    }
}

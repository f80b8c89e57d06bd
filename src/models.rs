/// A fully extracted listing, as read from one detail page
#[derive(Debug, Clone, PartialEq)]
pub struct CarListing {
    pub url: String,
    pub title: String,
    pub price_usd: i64,
    pub odometer: i64,
    pub username: String,
    pub phone_number: String,
    pub image_url: String,
    pub image_count: String,
    pub car_number: String, // License plate, empty if not shown
    pub car_vin: String,    // Empty if not shown
}

/// Outcome of reading a field the page may legitimately omit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<T> {
    Value(T),
    Missing,
}

impl<T> FieldValue<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            FieldValue::Value(value) => Some(value),
            FieldValue::Missing => None,
        }
    }
}

impl<T: Default> FieldValue<T> {
    /// Collapse to the stored representation: missing becomes the empty value
    pub fn unwrap_or_empty(self) -> T {
        self.into_option().unwrap_or_default()
    }
}

impl<T> From<Option<T>> for FieldValue<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => FieldValue::Value(value),
            None => FieldValue::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_collapses_to_empty_string() {
        let plate: FieldValue<String> = FieldValue::Missing;
        assert_eq!(plate, FieldValue::Missing);
        assert_eq!(plate.unwrap_or_empty(), "");
    }

    #[test]
    fn test_present_field_keeps_value() {
        let vin = FieldValue::Value("WBAKS410X00A12345".to_string());
        assert_eq!(vin.unwrap_or_empty(), "WBAKS410X00A12345");
    }

    #[test]
    fn test_from_option() {
        assert_eq!(FieldValue::from(Some(3)), FieldValue::Value(3));
        assert_eq!(FieldValue::<i32>::from(None), FieldValue::Missing);
    }
}

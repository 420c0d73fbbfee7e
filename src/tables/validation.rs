use super::TruthTables;

/// Validate the truth tables before scoring.
/// Returns all validation errors at once (not just the first).
pub fn validate_tables(tables: &TruthTables) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for (key, weight) in tables.weights.iter() {
        if !weight.is_finite() || weight < 0.0 {
            errors.push(format!("weights['{}']: must be a non-negative number, got {}", key, weight));
        }
    }

    for (id, pair) in tables.pairs.iter() {
        if pair.positive().trim().is_empty() || pair.negative().trim().is_empty() {
            errors.push(format!("pairs['{}']: stems must not be empty", id));
        }
        if !pair.weight().is_finite() || pair.weight() < 0.0 {
            errors.push(format!(
                "pairs['{}']: weight must be a non-negative number, got {}",
                id,
                pair.weight()
            ));
        }
    }

    for category in tables.categories.iter() {
        // An empty key would match every prompt
        for (i, key) in category.keys.iter().enumerate() {
            if key.trim().is_empty() {
                errors.push(format!("categories['{}'][{}]: key must not be empty", category.name, i));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

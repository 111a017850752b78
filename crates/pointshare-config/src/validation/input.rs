use crate::schema::PointshareConfig;

use super::helpers::validate_range;

pub(crate) fn validate_input(errors: &mut Vec<String>, config: &PointshareConfig) {
    validate_range(
        errors,
        "input.screen_width",
        config.input.screen_width,
        1,
        16384,
    );
    validate_range(
        errors,
        "input.screen_height",
        config.input.screen_height,
        1,
        16384,
    );
}

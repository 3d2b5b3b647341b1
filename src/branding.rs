pub const APP_DISPLAY_NAME: &str = "Float Panel";

pub const APP_CONFIG_QUALIFIER: &str = "com";
pub const APP_CONFIG_ORGANIZATION: &str = "float_panel";
pub const APP_CONFIG_APPLICATION: &str = "float_panel";

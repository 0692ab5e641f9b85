//! Built-in protection rules.
//!
//! These are always active. Configuration can add to them but never remove
//! any entry.

/// Core runtime paths, relative to the boundary root.
pub const RUNTIME_PATHS: &[&str] = &[
    "wp-admin",
    "wp-includes",
    "wp-config.php",
    ".htaccess",
    "index.php",
    "wp-load.php",
    "wp-blog-header.php",
    "wp-settings.php",
    "wp-activate.php",
    "wp-signup.php",
    "wp-cron.php",
    "xmlrpc.php",
    "license.txt",
    "readme.html",
    "wp-content/themes",
    "wp-content/plugins",
    "wp-content/mu-plugins",
    "wp-content/languages",
    "wp-content/db.php",
];

/// Patterns matched against the file name and the boundary-relative path.
pub const PROTECTED_PATTERNS: &[&str] = &[
    // configuration
    r"(?i)wp-config\.php$",
    r"(?i)wp-config-sample\.php$",
    r"(?i)wp-config-backup\.php$",
    r"(?i)\.htaccess$",
    // runtime entry points
    r"(?i)^wp-(admin|includes|content|load|blog-header|settings|activate|signup|cron)\.php$",
    r"(?i)^xmlrpc\.php$",
    r"(?i)^license\.txt$",
    r"(?i)^readme\.html$",
    r"(?i)^index\.php$",
    // web server and crawler files
    r"(?i)^web\.config$",
    r"(?i)^robots\.txt$",
    r"(?i)^sitemap.*\.xml$",
    // database dumps
    r"(?i)\.sql$",
    // logs and vcs markers
    r"(?i)^error_log$",
    r"(?i)^debug\.log$",
    r"(?i)^\.gitignore$",
    r"(?i)^\.gitkeep$",
    // certificate challenges
    r"(?i)^\.well-known(/|$)",
    // interpreter settings
    r"(?i)^\.user\.ini$",
    r"(?i)^php\.ini$",
];

/// Content that must never surface as a cleanup candidate, wherever it lives.
pub const CONTENT_PATTERNS: &[&str] = &[r"(?i)\.sql(\.(gz|zip|bz2|xz))?$"];

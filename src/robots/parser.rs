//! Robots.txt parser implementation
//!
//! Only `User-agent`, `Allow` and `Disallow` are understood, all as plain
//! path prefixes. Everything else (sitemaps, crawl-delay, wildcards) is
//! ignored.

/// One `Allow`/`Disallow` line from a block that applies to us
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotsRule {
    pub allow: bool,
    pub prefix: String,
}

/// Parsed robots.txt rules for one host, already filtered to our user agent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    /// Rules from matching blocks, in file order
    rules: Vec<RobotsRule>,
    /// Whether any `User-agent` line matched us
    matched_agent: bool,
}

impl RobotsRules {
    /// Parses robots.txt content for the given user agent
    ///
    /// A `User-agent` line applies when its value is `*` or appears
    /// (case-insensitively) inside `user_agent`. Consecutive `User-agent`
    /// lines form one group.
    ///
    /// # Example
    ///
    /// ```
    /// use sitewalk::robots::RobotsRules;
    ///
    /// let robots = RobotsRules::parse("User-agent: *\nDisallow: /admin", "Sitewalk/1.0");
    /// assert!(!robots.is_allowed("/admin/users"));
    /// assert!(robots.is_allowed("/"));
    /// ```
    pub fn parse(content: &str, user_agent: &str) -> Self {
        let agent = user_agent.to_lowercase();
        let mut rules = Vec::new();
        let mut matched_agent = false;
        let mut active = false;
        let mut in_agent_group = false;

        for line in content.lines() {
            let line = match line.split_once('#') {
                Some((before, _)) => before,
                None => line,
            }
            .trim();

            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    let value = value.to_lowercase();
                    let matches = value == "*" || (!value.is_empty() && agent.contains(&value));
                    active = if in_agent_group { active || matches } else { matches };
                    matched_agent |= matches;
                    in_agent_group = true;
                }
                "allow" | "disallow" => {
                    in_agent_group = false;
                    // An empty value is a no-op ("Disallow:" means allow everything)
                    if active && !value.is_empty() {
                        rules.push(RobotsRule {
                            allow: key == "allow",
                            prefix: value.to_string(),
                        });
                    }
                }
                _ => {
                    in_agent_group = false;
                }
            }
        }

        Self {
            rules,
            matched_agent,
        }
    }

    /// Creates a permissive rule set that allows everything
    ///
    /// Used when robots.txt is missing or could not be fetched.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Checks if a request path is allowed
    ///
    /// Every rule whose prefix matches is applied in file order, so the last
    /// matching rule decides. No match means allowed.
    pub fn is_allowed(&self, path: &str) -> bool {
        self.rules
            .iter()
            .rev()
            .find(|rule| path.starts_with(&rule.prefix))
            .map_or(true, |rule| rule.allow)
    }

    /// Whether any `User-agent` line in the file applied to us
    pub fn matched_agent(&self) -> bool {
        self.matched_agent
    }

    pub fn rules(&self) -> &[RobotsRule] {
        &self.rules
    }
}

use crate::models::RobotsCheck;
use anyhow::Result;
use url::Url;

/// Represents a robots.txt rule (either Allow or Disallow)
#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    pattern: String,
    is_allow: bool,
}

/// One `User-agent` section and the rules that follow it
#[derive(Debug, Clone, Default)]
struct Group {
    agents: Vec<String>,
    rules: Vec<Rule>,
}

/// Represents the parsed robots.txt file
#[derive(Debug, Default)]
pub struct RobotsTxt {
    groups: Vec<Group>,
    sitemaps: Vec<String>,
}

impl RobotsTxt {
    /// Parses robots.txt content
    pub fn parse(content: &str) -> Self {
        let mut robots = Self::default();
        let mut current: Option<Group> = None;

        for line in content.lines() {
            // Strip trailing comments as well as full-line ones
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let field = field.trim().to_lowercase();
            let value = value.trim();

            match field.as_str() {
                "user-agent" => {
                    // Consecutive User-agent lines share one group
                    match current.as_mut() {
                        Some(group) if group.rules.is_empty() => {
                            group.agents.push(value.to_lowercase());
                        }
                        _ => {
                            if let Some(group) = current.take() {
                                robots.groups.push(group);
                            }
                            current = Some(Group {
                                agents: vec![value.to_lowercase()],
                                rules: Vec::new(),
                            });
                        }
                    }
                }
                "disallow" | "allow" => {
                    if value.is_empty() {
                        continue;
                    }
                    let rule = Rule {
                        pattern: value.to_string(),
                        is_allow: field == "allow",
                    };
                    // Rules before any User-agent line apply to nobody but still count
                    current.get_or_insert_with(Group::default).rules.push(rule);
                }
                "sitemap" => {
                    if !value.is_empty() {
                        robots.sitemaps.push(value.to_string());
                    }
                }
                _ => {
                    // Ignore other directives (Crawl-delay, Host, etc.)
                }
            }
        }

        if let Some(group) = current {
            robots.groups.push(group);
        }

        robots
    }

    /// Sitemap URLs declared with `Sitemap:` lines, in file order
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    pub fn has_user_agent(&self) -> bool {
        self.groups.iter().any(|group| !group.agents.is_empty())
    }

    /// True when some group disallows `/` and no Allow rule exists anywhere
    pub fn blocks_everything(&self) -> bool {
        let rules = || self.groups.iter().flat_map(|group| group.rules.iter());
        let blanket_disallow = rules().any(|rule| !rule.is_allow && rule.pattern == "/");
        let any_allow = rules().any(|rule| rule.is_allow);
        blanket_disallow && !any_allow
    }

    /// Advisory issues for the robots.txt check
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !self.has_user_agent() {
            issues.push("robots.txt has no User-agent directive".to_string());
        }
        if self.sitemaps.is_empty() {
            issues.push("robots.txt does not declare a Sitemap".to_string());
        }
        if self.blocks_everything() {
            issues.push("robots.txt blocks all crawlers (Disallow: /)".to_string());
        }
        issues
    }
}

/// Gets the robots.txt URL for a base URL
pub fn robots_url(base_url: &Url) -> String {
    let mut url = base_url.clone();
    url.set_path("/robots.txt");
    url.set_query(None);
    url.set_fragment(None);
    url.to_string()
}

/// Fetches robots.txt. `Ok(None)` means the server answered without a file.
pub async fn fetch_robots_txt(client: &reqwest::Client, base_url: &Url) -> Result<Option<String>> {
    let url = robots_url(base_url);
    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        tracing::info!(url = %url, status = %response.status(), "robots.txt not found");
        return Ok(None);
    }

    Ok(Some(response.text().await?))
}

/// Probes robots.txt presence and content for the advanced checks
pub async fn check_robots(client: &reqwest::Client, base_url: &Url) -> RobotsCheck {
    match fetch_robots_txt(client, base_url).await {
        Ok(Some(content)) => {
            let issues = RobotsTxt::parse(&content).issues();
            RobotsCheck {
                exists: true,
                content: Some(content),
                issues,
            }
        }
        Ok(None) => RobotsCheck {
            exists: false,
            content: None,
            issues: vec!["robots.txt not found".to_string()],
        },
        Err(e) => {
            tracing::warn!(url = %robots_url(base_url), error = %e, "Failed to fetch robots.txt");
            RobotsCheck {
                exists: false,
                content: None,
                issues: vec![format!("robots.txt could not be fetched: {}", e)],
            }
        }
    }
}

use crate::domain::Item;
use crate::rules::Rule;

/// Sponsored posts announced in the feed itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExcludeSponsors;

const SPONSOR_PREFIXES: [&str; 3] = ["RSS Sponsor:", "(Sponsor)", "Sponsor – "];

impl Rule for ExcludeSponsors {
    fn name(&self) -> &str {
        "sponsors"
    }

    fn evaluate(&self, item: &Item) -> bool {
        SPONSOR_PREFIXES
            .iter()
            .any(|prefix| item.title().starts_with(prefix))
    }
}

/// Blog posts that only announce a new podcast episode or guest appearance.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExcludePodcastAnnouncements;

impl Rule for ExcludePodcastAnnouncements {
    fn name(&self) -> &str {
        "podcast_announcements"
    }

    fn evaluate(&self, item: &Item) -> bool {
        let title = item.title();
        let content = item.content();

        if content.contains("relay.fm") && (title.contains('#') || is_numbered_episode(title, "MPU"))
        {
            return true;
        }

        if title.starts_with("Appearance: ") && content.contains("I joined") {
            return true;
        }

        title.starts_with("(Podcast)") || title.starts_with("Podcast: ")
    }
}

/// `<show> <number>: ...` at the start of a title.
fn is_numbered_episode(title: &str, show: &str) -> bool {
    let Some(rest) = title
        .strip_prefix(show)
        .and_then(|rest| rest.strip_prefix(' '))
    else {
        return false;
    };

    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && rest[digits..].starts_with(": ")
}

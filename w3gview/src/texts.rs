use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use w3g_replays::events::ReceiverScope;
use w3g_replays::header::GameKind;
use w3g_replays::roster::{AiStrength, Color, Race};

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl Locale {
    /// Picks Chinese when the environment's language is Chinese.
    pub fn from_env() -> Locale {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|value| !value.is_empty())
            .map(|value| Locale::from_language_tag(&value))
            .unwrap_or_default()
    }

    pub fn from_language_tag(tag: &str) -> Locale {
        if tag.starts_with("zh") {
            Locale::Zh
        } else {
            Locale::En
        }
    }
}

/// Every piece of user-facing text the viewer prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text {
    FilePath,
    FileSize,
    Version,
    Duration,
    GameKind(GameKind),
    GameName,
    Map,
    Creator,
    Players,
    Name,
    Host,
    Computer,
    Yes,
    No,
    Team,
    ColorLabel,
    Color(Color),
    NoColor,
    RaceLabel,
    Race(Race),
    AiStrength(AiStrength),
    Handicap,
    PlayingTime,
    Actions,
    Apm,
    Chat,
    Scope(ReceiverScope),
    StartupScreen,
}

/// Looks up the display string for `text` in `locale`.
pub fn text(text: Text, locale: Locale) -> &'static str {
    match locale {
        Locale::En => english(text),
        Locale::Zh => chinese(text),
    }
}

fn english(text: Text) -> &'static str {
    match text {
        Text::FilePath => "file: ",
        Text::FileSize => "size: ",
        Text::Version => "version: ",
        Text::Duration => "duration: ",
        Text::GameKind(GameKind::SinglePlayer) => "single player game",
        Text::GameKind(GameKind::MultiPlayer) => "multi player game",
        Text::GameName => "game: ",
        Text::Map => "map: ",
        Text::Creator => "creator: ",
        Text::Players => "players",
        Text::Name => "name: ",
        Text::Host => "host: ",
        Text::Computer => "computer: ",
        Text::Yes => "yes",
        Text::No => "no",
        Text::Team => "team: ",
        Text::ColorLabel => "color: ",
        Text::Color(color) => match color {
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Teal => "cyan",
            Color::Purple => "purple",
            Color::Yellow => "yellow",
            Color::Orange => "orange",
            Color::Green => "green",
            Color::Pink => "pink",
            Color::Gray => "gray",
            Color::LightBlue => "light blue",
            Color::DarkGreen => "dark green",
            Color::Brown => "brown",
            Color::Observer => "observer or referee",
        },
        Text::NoColor => "unknown",
        Text::RaceLabel => "race: ",
        Text::Race(race) => match race {
            Race::Human => "human",
            Race::Orc => "orc",
            Race::NightElf => "nightelf",
            Race::Undead => "undead",
            Race::Random => "random",
            Race::Unspecified => "unspecified",
        },
        Text::AiStrength(strength) => match strength {
            AiStrength::Easy => "easy",
            AiStrength::Normal => "normal",
            AiStrength::Insane => "insane",
        },
        Text::Handicap => "handicap: ",
        Text::PlayingTime => "playing time: ",
        Text::Actions => "actions: ",
        Text::Apm => "APM: ",
        Text::Chat => "chat",
        Text::Scope(scope) => match scope {
            ReceiverScope::All => "all",
            ReceiverScope::Allies => "allies",
            ReceiverScope::Observers => "observers",
            ReceiverScope::Slot(_) => "slot",
        },
        Text::StartupScreen => "loading screen",
    }
}

fn chinese(text: Text) -> &'static str {
    match text {
        Text::FilePath => "文件路径：",
        Text::FileSize => "文件大小：",
        Text::Version => "版本：",
        Text::Duration => "时长：",
        Text::GameKind(GameKind::SinglePlayer) => "单人游戏",
        Text::GameKind(GameKind::MultiPlayer) => "多人游戏",
        Text::GameName => "游戏名称：",
        Text::Map => "地图：",
        Text::Creator => "创建者：",
        Text::Players => "玩家",
        Text::Name => "名称：",
        Text::Host => "主机：",
        Text::Computer => "是否电脑玩家：",
        Text::Yes => "是",
        Text::No => "否",
        Text::Team => "队伍：",
        Text::ColorLabel => "颜色：",
        Text::Color(color) => match color {
            Color::Red => "红色",
            Color::Blue => "蓝色",
            Color::Teal => "青色",
            Color::Purple => "紫色",
            Color::Yellow => "黄色",
            Color::Orange => "橘黄色",
            Color::Green => "绿色",
            Color::Pink => "粉红色",
            Color::Gray => "灰色",
            Color::LightBlue => "淡蓝色",
            Color::DarkGreen => "深绿色",
            Color::Brown => "棕色",
            Color::Observer => "观察者或裁判",
        },
        Text::NoColor => "未知",
        Text::RaceLabel => "种族：",
        Text::Race(race) => match race {
            Race::Human => "人族",
            Race::Orc => "兽族",
            Race::NightElf => "暗夜精灵",
            Race::Undead => "不死族",
            Race::Random => "随机",
            Race::Unspecified => "未指定",
        },
        Text::AiStrength(strength) => match strength {
            AiStrength::Easy => "简单",
            AiStrength::Normal => "中等",
            AiStrength::Insane => "令人发狂的",
        },
        Text::Handicap => "障碍（血量）：",
        Text::PlayingTime => "游戏时间：",
        Text::Actions => "操作次数：",
        Text::Apm => "APM：",
        Text::Chat => "聊天记录",
        Text::Scope(scope) => match scope {
            ReceiverScope::All => "所有人",
            ReceiverScope::Allies => "盟友",
            ReceiverScope::Observers => "观察者",
            ReceiverScope::Slot(_) => "位置",
        },
        Text::StartupScreen => "载入画面",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_color_and_race_is_translated() {
        for locale in Locale::iter() {
            for color in Color::iter() {
                assert!(!text(Text::Color(color), locale).is_empty());
            }
            for race in Race::iter() {
                assert!(!text(Text::Race(race), locale).is_empty());
            }
            for strength in AiStrength::iter() {
                assert!(!text(Text::AiStrength(strength), locale).is_empty());
            }
        }
    }

    #[test]
    fn locales_differ() {
        assert_eq!(text(Text::Race(Race::NightElf), Locale::En), "nightelf");
        assert_eq!(text(Text::Race(Race::NightElf), Locale::Zh), "暗夜精灵");
        assert_eq!(
            text(Text::GameKind(GameKind::MultiPlayer), Locale::Zh),
            "多人游戏"
        );
        assert_eq!(text(Text::Color(Color::Teal), Locale::En), "cyan");
    }

    #[test]
    fn parses_locale_names() {
        assert_eq!("zh".parse::<Locale>().unwrap(), Locale::Zh);
        assert_eq!(Locale::from_language_tag("zh_CN.UTF-8"), Locale::Zh);
        assert_eq!(Locale::from_language_tag("en_US.UTF-8"), Locale::En);
        assert!("fr".parse::<Locale>().is_err());
    }
}

//! Static station and train-type directories for both networks, plus the
//! text matching used by the conversation flow.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::database::models::Mode;

/// TRA station codes as used by the upstream feed, in line order.
pub const TRA_STATIONS: &[(&str, &str)] = &[
    // 縱貫線北段
    ("0900", "基隆"),
    ("0910", "三坑"),
    ("0920", "八堵"),
    ("0930", "七堵"),
    ("0940", "百福"),
    ("0950", "五堵"),
    ("0960", "汐止"),
    ("0970", "汐科"),
    ("0980", "南港"),
    ("0990", "松山"),
    ("1000", "臺北"),
    ("1010", "萬華"),
    ("1020", "板橋"),
    ("1030", "樹林"),
    ("1040", "南樹林"),
    ("1050", "山佳"),
    ("1060", "鶯歌"),
    ("1070", "桃園"),
    ("1080", "內壢"),
    ("1090", "中壢"),
    ("1100", "埔心"),
    ("1110", "楊梅"),
    ("1120", "富岡"),
    ("1130", "湖口"),
    ("1140", "新豐"),
    ("1150", "竹北"),
    ("1160", "北新竹"),
    ("1170", "新竹"),
    ("1180", "三姓橋"),
    ("1190", "香山"),
    ("1200", "崎頂"),
    ("1210", "竹南"),
    // 海線
    ("1220", "談文"),
    ("1230", "大山"),
    ("1240", "後龍"),
    ("1250", "龍港"),
    ("1260", "白沙屯"),
    ("1270", "新埔"),
    ("1280", "通霄"),
    ("1290", "苑裡"),
    ("1300", "日南"),
    ("1310", "大甲"),
    ("1320", "臺中港"),
    ("1330", "清水"),
    ("1340", "沙鹿"),
    ("1350", "龍井"),
    ("1360", "大肚"),
    ("1370", "追分"),
    // 山線
    ("1400", "造橋"),
    ("1410", "豐富"),
    ("1420", "苗栗"),
    ("1430", "南勢"),
    ("1440", "銅鑼"),
    ("1450", "三義"),
    ("1460", "泰安"),
    ("1470", "后里"),
    ("1480", "豐原"),
    ("1490", "潭子"),
    ("1500", "太原"),
    ("1510", "臺中"),
    ("1520", "大慶"),
    ("1530", "烏日"),
    ("1540", "新烏日"),
    ("1550", "成功"),
    // 縱貫線南段
    ("1600", "彰化"),
    ("1610", "花壇"),
    ("1620", "大村"),
    ("1630", "員林"),
    ("1640", "永靖"),
    ("1650", "社頭"),
    ("1660", "田中"),
    ("1670", "二水"),
    ("1680", "林內"),
    ("1690", "石榴"),
    ("1700", "斗六"),
    ("1710", "斗南"),
    ("1720", "石龜"),
    ("1730", "大林"),
    ("1740", "民雄"),
    ("1750", "嘉北"),
    ("1760", "嘉義"),
    ("1770", "水上"),
    ("1780", "南靖"),
    ("1790", "後壁"),
    ("1800", "新營"),
    ("1810", "柳營"),
    ("1820", "林鳳營"),
    ("1830", "隆田"),
    ("1840", "拔林"),
    ("1850", "善化"),
    ("1860", "新市"),
    ("1870", "永康"),
    ("1880", "大橋"),
    ("1890", "臺南"),
    ("1900", "保安"),
    ("1910", "中洲"),
    ("1920", "大湖"),
    ("1930", "路竹"),
    ("1940", "岡山"),
    ("1950", "橋頭"),
    ("1960", "楠梓"),
    ("1970", "新左營"),
    ("1980", "左營"),
    ("1990", "高雄"),
    // 屏東線
    ("2000", "鳳山"),
    ("2010", "後庄"),
    ("2020", "九曲堂"),
    ("2030", "六塊厝"),
    ("2040", "屏東"),
    // 內灣線
    ("6010", "千甲"),
    ("6020", "新莊"),
    ("6030", "竹中"),
    ("6040", "六家"),
    ("6050", "上員"),
    ("6060", "榮華"),
    ("6070", "竹東"),
    ("6080", "橫山"),
    ("6090", "九讚頭"),
    ("6100", "合興"),
    ("6110", "富貴"),
    ("6120", "內灣"),
    // 宜蘭線
    ("7080", "瑞芳"),
    ("7130", "頭城"),
    ("7150", "礁溪"),
    ("7160", "宜蘭"),
    ("7190", "羅東"),
    ("7210", "蘇澳新"),
    ("7220", "蘇澳"),
    // 東部幹線
    ("7290", "花蓮"),
    ("7360", "光復"),
    ("7480", "玉里"),
    ("7500", "臺東"),
];

pub const THSR_STATIONS: &[(&str, &str)] = &[
    ("0990", "南港"),
    ("1000", "臺北"),
    ("1010", "板橋"),
    ("1020", "桃園"),
    ("1030", "新竹"),
    ("1035", "苗栗"),
    ("1040", "臺中"),
    ("1043", "彰化"),
    ("1047", "雲林"),
    ("1050", "嘉義"),
    ("1060", "臺南"),
    ("1070", "左營"),
];

/// TRA train-type codes, collapsed to the display category the bot prints.
pub const TRA_TRAIN_TYPES: &[(&str, &str)] = &[
    ("1100", "自強"),
    ("1101", "自強"),
    ("1102", "自強"),
    ("1103", "自強"),
    ("1107", "自強"),
    ("1108", "自強"),
    ("1110", "莒光"),
    ("1111", "莒光"),
    ("1114", "莒光"),
    ("1115", "莒光"),
    ("1120", "復興"),
    ("1131", "區間"),
    ("1132", "區間快"),
    ("1140", "普快"),
];

lazy_static! {
    static ref TRA_CODE2NAME: HashMap<&'static str, &'static str> =
        TRA_STATIONS.iter().copied().collect();
    static ref THSR_CODE2NAME: HashMap<&'static str, &'static str> =
        THSR_STATIONS.iter().copied().collect();
    static ref TRA_TYPE2NAME: HashMap<&'static str, &'static str> =
        TRA_TRAIN_TYPES.iter().copied().collect();
    static ref RE_TRA_STATION: Regex = station_regex(TRA_STATIONS);
    static ref RE_THSR_STATION: Regex = station_regex(THSR_STATIONS);
}

// Longer names first, so 臺中港 wins over 臺中 in the alternation.
fn station_regex(stations: &[(&str, &str)]) -> Regex {
    let mut names: Vec<&str> = stations.iter().map(|&(_, name)| name).collect();
    names.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    Regex::new(&format!("^({})", names.join("|"))).unwrap()
}

/// Resolves a raw station code to its display name, or None for codes the
/// directory does not know.
pub fn station_name(mode: Mode, code: &str) -> Option<&'static str> {
    match mode {
        Mode::Tra => TRA_CODE2NAME.get(code).copied(),
        Mode::Thsr => THSR_CODE2NAME.get(code).copied(),
    }
}

pub fn train_type_name(code: &str) -> Option<&'static str> {
    TRA_TYPE2NAME.get(code).copied()
}

/// Deals with words like 臺 and 台: user input is folded to the 臺 variant
/// used by the station directory.
pub fn fold_text(text: &str) -> String {
    text.replace('台', "臺")
}

/// Prefix-matches user text against the mode's station list and returns the
/// canonical station name. The input is expected to be folded already.
pub fn match_station(mode: Mode, text: &str) -> Option<&'static str> {
    let re = match mode {
        Mode::Tra => &*RE_TRA_STATION,
        Mode::Thsr => &*RE_THSR_STATION,
    };
    let matched = re.captures(text)?.get(1)?;
    let stations = match mode {
        Mode::Tra => TRA_STATIONS,
        Mode::Thsr => THSR_STATIONS,
    };
    stations
        .iter()
        .find(|&&(_, name)| name == matched.as_str())
        .map(|&(_, name)| name)
}

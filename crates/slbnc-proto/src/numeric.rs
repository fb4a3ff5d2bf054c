//! Numeric replies the relay reads or fabricates.
#![allow(missing_docs)]

pub const RPL_WELCOME: u16 = 1;
pub const RPL_ISUPPORT: u16 = 5;
pub const RPL_ENDOFWHO: u16 = 315;
pub const RPL_CHANNELMODEIS: u16 = 324;
pub const RPL_CREATIONTIME: u16 = 329;
pub const RPL_NOTOPIC: u16 = 331;
pub const RPL_TOPIC: u16 = 332;
pub const RPL_TOPICWHOTIME: u16 = 333;
pub const RPL_VERSION: u16 = 351;
pub const RPL_WHOREPLY: u16 = 352;
pub const RPL_NAMREPLY: u16 = 353;
pub const RPL_ENDOFNAMES: u16 = 366;
pub const RPL_BANLIST: u16 = 367;
pub const RPL_ENDOFBANLIST: u16 = 368;
pub const RPL_ENDOFMOTD: u16 = 376;
pub const RPL_HOSTHIDDEN: u16 = 396;
pub const ERR_NOMOTD: u16 = 422;
pub const ERR_NICKNAMEINUSE: u16 = 433;
pub const ERR_YOUREBANNEDCREEP: u16 = 465;

/// Three-digit wire form of a numeric.
///
/// ```
/// assert_eq!(slbnc_proto::numeric::code(5), "005");
/// ```
pub fn code(numeric: u16) -> String {
    format!("{:03}", numeric)
}

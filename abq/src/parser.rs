use nom::{
    character::complete::{char, digit1, one_of, satisfy, alpha1, space0, space1, multispace0, multispace1},
    Finish,
    IResult,
    combinator::{all_consuming, map, map_opt, map_res, opt, recognize},
    sequence::{delimited, pair, preceded, separated_pair, tuple},
    multi::many0,
    branch::alt,
    bytes::complete::{tag, take_while, take_while_m_n},
};
use abif::*;
use anyhow::{anyhow, bail, Result};
use base64::decode;
use std::str::FromStr;

const B64_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/=";

fn signed<T: FromStr>(i: &str) -> IResult<&str, T> {
    map_res(recognize(pair(opt(char('-')), digit1)), |n: &str| n.parse())(i)
}

fn version(i: &str) -> IResult<&str, (u16, u16)> {
    preceded(pair(tag("abif"), space1), separated_pair(signed::<u16>, char('.'), signed::<u16>))(i)
}

// Plain characters are printable ASCII, any other byte has to be written as `\xHH`
fn name_byte(i: &str) -> IResult<&str, u8> {
    alt((
        map_res(preceded(tag("\\x"), take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit())), |h: &str| u8::from_str_radix(h, 16)),
        map(preceded(char('\\'), one_of("\"\\")), |c: char| c as u8),
        map(satisfy(|c| (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' '), |c: char| c as u8),
    ))(i)
}

fn key(i: &str) -> IResult<&str, Key> {
    map_res(
        separated_pair(delimited(char('"'), many0(name_byte), char('"')), space1, signed::<i32>),
        |(name, number): (Vec<u8>, i32)| <[u8; 4]>::try_from(name.as_slice()).map(|name| Key::verbatim(name, number))
    )(i)
}

fn element_type(i: &str) -> IResult<&str, ElementType> {
    alt((
        map_opt(alpha1, ElementType::from_name),
        map(preceded(char('#'), signed::<i16>), ElementType::from),
    ))(i)
}

fn payload(i: &str) -> IResult<&str, Vec<u8>> {
    map_res(delimited(char('\''), take_while(move |c: char| B64_CHARS.contains(c)), char('\'')), |b: &str| decode(b))(i)
}

fn value(i: &str) -> IResult<&str, Value> {
    map_res(
        tuple((element_type, space1, signed::<i16>, space1, char('x'), space1, signed::<i32>, space0, char('='), space0, payload)),
        |(t, _, size, _, _, _, count, _, _, _, bytes)| Value::new(t, size, count, bytes)
    )(i)
}

fn entry(i: &str) -> IResult<&str, (Key, Value)> {
    separated_pair(key, tuple((space0, char(':'), space0)), value)(i)
}

/// Parses the textual representation which `Container` implements `Display` for
pub fn parse(i: &str) -> Result<Container> {
    let (_, ((major, minor), entries)) = all_consuming(delimited(
        multispace0,
        pair(version, many0(preceded(multispace1, entry))),
        multispace0,
    ))(i).finish().map_err(|e| anyhow!("{}", e))?;
    let mut container = Container::new(major, minor);
    for (key, value) in entries {
        if container.insert(key, value).is_some() {
            bail!("key {} is defined more than once", key);
        }
    }
    Ok(container)
}

#[cfg(test)]
mod tests {
    use super::parse;
    use abif::*;

    fn sample() -> Container {
        let mut container = Container::new(1, 4);
        container.insert(Key::new("DATA", 1).unwrap(), Value::new(ElementType::Short, 2, 3, vec![0, 1, 0, 2, 0, 3]).unwrap());
        container.insert(Key::new("PBAS", 2).unwrap(), Value::new(ElementType::Char, 1, 2, &b"AC"[..]).unwrap());
        container.insert(Key::new("a\"b\\", -5).unwrap(), Value::new(ElementType::Other(1024), 1, 1, vec![2]).unwrap());
        container.insert(Key::new([b'R', b'u', b'n', 0x01], 1).unwrap(), Value::new(ElementType::Other(-2), 1, 0, vec![]).unwrap());
        container
    }

    #[test]
    fn display_roundtrip() {
        let container = sample();
        assert_eq!(container, parse(&container.to_string()).unwrap());
        assert_eq!(Container::new(1, 0), parse("abif 1.0").unwrap());
    }

    #[test]
    fn whitespace() {
        let parsed = parse("\n  abif 1.4\n\"PBAS\" 2 :  char 1 x 2='AABBQw=='\n\n").unwrap();
        assert_eq!(parsed.get(b"PBAS", 2).unwrap().bytes(), [0, 0, b'A', b'C']);
    }

    #[test]
    fn escapes() {
        let parsed = parse("abif 1.4\n\"\\x41\\\\\\\"B\" 1: byte 1 x 1 = 'AQ=='").unwrap();
        assert!(parsed.get(b"A\\\"B", 1).is_some());
    }

    #[test]
    fn non_ascii_names() {
        let mut container = Container::new(1, 4);
        container.insert(Key::verbatim([b'R', b'u', b'n', 0xc4], 1), Value::new(ElementType::Byte, 1, 1, vec![7]).unwrap());
        let decoded = from_bytes(&to_bytes(&container).unwrap()).unwrap();
        let printed = decoded.to_string();
        assert_eq!("abif 1.4\n\"Run\\xc4\" 1: byte 1 x 1 = 'AAAABw=='", printed);
        assert_eq!(decoded, parse(&printed).unwrap());
    }

    #[test]
    fn errors() {
        assert!(parse("").is_err());
        assert!(parse("abif 1.4 trailing").is_err());
        assert!(parse("abif 1.4\n\"DAT\" 1: byte 1 x 1 = 'AQ=='").is_err());
        assert!(parse("abif 1.4\n\"DAT\\x+f\" 1: byte 1 x 1 = 'AQ=='").is_err());
        assert!(parse("abif 1.4\n\"DAT\\x4\" 1: byte 1 x 1 = 'AQ=='").is_err());
        assert!(parse("abif 1.4\n\"DATÄ\" 1: byte 1 x 1 = 'AQ=='").is_err());
        assert!(parse("abif 1.4\n\"DATA\" 1: nonsense 1 x 1 = 'AQ=='").is_err());
        assert!(parse("abif 1.4\n\"DATA\" 1: double 8 x 1 = 'AQ=='").is_err());
        assert!(parse("abif 1.4\n\"DATA\" 1: byte 1 x 1 = 'AQ=='\n\"DATA\" 1: byte 1 x 1 = 'Ag=='").is_err());
    }

    #[test]
    fn encodes_to_abif() {
        let container = parse("abif 1.4\n\"PBAS\" 1: char 1 x 5 = 'QUNHVEE='").unwrap();
        let buf = to_bytes(&container).unwrap();
        assert_eq!(&buf[buf.len() - 5..], b"ACGTA");
        assert_eq!(container, from_bytes(&buf).unwrap());
    }

}

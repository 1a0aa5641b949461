//! WKT reader built from `nom` combinators.
//!
//! Grammar failures carry the remaining input so they can be reported with
//! the byte offset into the record.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use nom::branch::alt;
use nom::character::complete::{alpha1, char, multispace0};
use nom::combinator::{cut, map, opt, verify};
use nom::error::{ErrorKind, ParseError as NomParseError};
use nom::multi::{many0, separated_list1};
use nom::number::complete::recognize_float;
use nom::sequence::{delimited, pair, preceded};
use nom::{IResult, Parser};

use crate::domain::Shape;
use crate::error::{ParseError, ParseResult};

#[derive(Debug)]
enum Failure {
    Expected(&'static str),
    Number(String),
    Invalid(ParseError),
}

#[derive(Debug)]
struct WktError<'a> {
    input: &'a str,
    failure: Failure,
}

impl<'a> NomParseError<&'a str> for WktError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        WktError {
            input,
            failure: Failure::Expected("WKT token"),
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a> WktError<'a> {
    fn invalid(input: &'a str, error: ParseError) -> nom::Err<Self> {
        nom::Err::Failure(WktError {
            input,
            failure: Failure::Invalid(error),
        })
    }

    /// Name what was expected, unless a more specific failure is already set
    fn expecting(self, expected: &'static str) -> Self {
        match self.failure {
            Failure::Expected(_) => WktError {
                input: self.input,
                failure: Failure::Expected(expected),
            },
            _ => self,
        }
    }

    fn into_parse_error(self, src: &str) -> ParseError {
        let rest = self.input.trim_start();
        let offset = src.len() - rest.len();
        match self.failure {
            Failure::Invalid(error) => error,
            Failure::Number(text) => ParseError::InvalidNumber { text, offset },
            Failure::Expected(expected) if rest.is_empty() => ParseError::UnexpectedEnd { expected },
            Failure::Expected(expected) => ParseError::UnexpectedToken {
                found: leading_token(rest),
                expected,
                offset,
            },
        }
    }
}

type WResult<'a, O> = IResult<&'a str, O, WktError<'a>>;

/// First word, number or punctuation character of `rest`
fn leading_token(rest: &str) -> String {
    let end = rest
        .find(|c: char| c.is_whitespace() || "(),".contains(c))
        .unwrap_or(rest.len());
    let end = if end == 0 {
        rest.chars().next().map_or(0, |c| c.len_utf8())
    } else {
        end
    };
    rest[..end].to_string()
}

fn expect<'a, O, F>(expected: &'static str, mut parser: F) -> impl FnMut(&'a str) -> WResult<'a, O>
where
    F: Parser<&'a str, O, WktError<'a>>,
{
    move |input| {
        parser
            .parse(input)
            .map_err(|e| e.map(|err| err.expecting(expected)))
    }
}

fn symbol<'a>(c: char, expected: &'static str) -> impl FnMut(&'a str) -> WResult<'a, char> {
    expect(expected, preceded(multispace0, char(c)))
}

fn word(input: &str) -> WResult<'_, &str> {
    preceded(multispace0, alpha1)(input)
}

fn keyword<'a>(name: &'static str) -> impl FnMut(&'a str) -> WResult<'a, &'a str> {
    verify(word, move |w: &str| w.eq_ignore_ascii_case(name))
}

/// Z, M and ZM are accepted; the extra ordinates are dropped in [`coord`]
fn dimension_tag(input: &str) -> WResult<'_, &str> {
    verify(word, |w: &str| {
        ["Z", "M", "ZM"].iter().any(|tag| w.eq_ignore_ascii_case(tag))
    })(input)
}

fn number(input: &str) -> WResult<'_, f64> {
    let (input, _) = multispace0(input)?;
    let (rest, text) = expect("number", recognize_float)(input)?;
    match text.parse::<f64>() {
        Ok(value) => Ok((rest, value)),
        Err(_) => Err(nom::Err::Failure(WktError {
            input,
            failure: Failure::Number(text.to_string()),
        })),
    }
}

fn coord(input: &str) -> WResult<'_, Coord<f64>> {
    map(pair(pair(number, number), many0(number)), |((x, y), _)| Coord { x, y })(input)
}

fn ring(input: &str) -> WResult<'_, LineString<f64>> {
    let (rest, coords) = delimited(
        symbol('(', "'('"),
        separated_list1(symbol(',', "','"), cut(coord)),
        symbol(')', "',' or ')'"),
    )(input)?;

    if coords.first() != coords.last() {
        return Err(WktError::invalid(input, ParseError::UnclosedRing));
    }
    if coords.len() < 4 {
        return Err(WktError::invalid(
            input,
            ParseError::TooFewPoints {
                actual: coords.len(),
            },
        ));
    }
    Ok((rest, LineString::new(coords)))
}

fn polygon_text(input: &str) -> WResult<'_, Polygon<f64>> {
    let (rest, mut rings) = delimited(
        symbol('(', "'('"),
        separated_list1(symbol(',', "','"), cut(ring)),
        symbol(')', "',' or ')'"),
    )(input)?;
    let exterior = rings.remove(0);
    Ok((rest, Polygon::new(exterior, rings)))
}

fn multi_polygon_text(input: &str) -> WResult<'_, MultiPolygon<f64>> {
    let member = alt((map(keyword("EMPTY"), |_| None), map(polygon_text, Some)));
    map(
        delimited(
            symbol('(', "'('"),
            separated_list1(symbol(',', "','"), cut(member)),
            symbol(')', "',' or ')'"),
        ),
        |members| MultiPolygon::new(members.into_iter().flatten().collect()),
    )(input)
}

fn geometry(input: &str) -> WResult<'_, Shape> {
    let (rest, name) = expect("geometry keyword", word)(input)?;
    let multi = if name.eq_ignore_ascii_case("MULTIPOLYGON") {
        true
    } else if name.eq_ignore_ascii_case("POLYGON") {
        false
    } else {
        return Err(WktError::invalid(
            input,
            ParseError::UnsupportedType(name.to_uppercase()),
        ));
    };

    let (rest, _) = opt(dimension_tag)(rest)?;
    if let Ok((rest, _)) = keyword("EMPTY")(rest) {
        return Ok((rest, Shape::empty()));
    }
    if multi {
        map(multi_polygon_text, Shape::MultiPolygon)(rest)
    } else {
        map(polygon_text, Shape::Polygon)(rest)
    }
}

/// Parse one complete `POLYGON` or `MULTIPOLYGON` record.
///
/// The whole input must be consumed; anything after the geometry is an error.
pub fn read_wkt(text: &str) -> ParseResult<Shape> {
    match geometry(text) {
        Ok((rest, shape)) => {
            let trailing = rest.trim_start();
            if trailing.is_empty() {
                Ok(shape)
            } else {
                Err(ParseError::TrailingInput {
                    offset: text.len() - trailing.len(),
                })
            }
        }
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(e.into_parse_error(text)),
        Err(nom::Err::Incomplete(_)) => Err(ParseError::UnexpectedEnd {
            expected: "geometry",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    #[test]
    fn test_read_polygon() {
        let shape = read_wkt("POLYGON ((0 0, 2 0, 2 2, 0 2, 0 0))").unwrap();
        match shape {
            Shape::Polygon(p) => {
                assert_eq!(p.exterior().0.len(), 5);
                assert!((p.unsigned_area() - 4.0).abs() < 1e-12);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_read_polygon_with_hole_lowercase() {
        let shape =
            read_wkt("polygon((0 0,10 0,10 10,0 10,0 0),(2 2,4 2,4 4,2 4,2 2))").unwrap();
        match shape {
            Shape::Polygon(p) => assert_eq!(p.interiors().len(), 1),
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_read_multipolygon() {
        let shape = read_wkt(
            "MULTIPOLYGON (((0 0, 1 0, 1 1, 0 1, 0 0)), ((5 5, 6 5, 6 6, 5 6, 5 5)))",
        )
        .unwrap();
        assert!(matches!(shape, Shape::MultiPolygon(_)));
        assert_eq!(shape.member_count(), 2);
    }

    #[test]
    fn test_read_drops_z_ordinate() {
        let shape = read_wkt("POLYGON Z ((0 0 1, 1 0 1, 1 1 1, 0 0 1))").unwrap();
        let p = &shape.polygons()[0];
        assert_eq!(p.exterior().0[1], Coord { x: 1.0, y: 0.0 });
    }

    #[test]
    fn test_read_scientific_and_negative() {
        let shape = read_wkt("POLYGON ((-1e-3 0, 1E2 0, 1e2 -2.5, -1e-3 0))").unwrap();
        let p = &shape.polygons()[0];
        assert_eq!(p.exterior().0[0].x, -0.001);
        assert_eq!(p.exterior().0[2].y, -2.5);
    }

    #[test]
    fn test_read_empty() {
        let shape = read_wkt("POLYGON EMPTY").unwrap();
        assert_eq!(shape.member_count(), 0);
    }

    #[test]
    fn test_unclosed_ring_rejected() {
        let err = read_wkt("POLYGON ((0 0, 1 0, 1 1, 0 1))").unwrap_err();
        assert_eq!(err, ParseError::UnclosedRing);
    }

    #[test]
    fn test_too_few_points_rejected() {
        let err = read_wkt("POLYGON ((0 0, 1 0, 0 0))").unwrap_err();
        assert_eq!(err, ParseError::TooFewPoints { actual: 3 });
    }

    #[test]
    fn test_unsupported_type() {
        let err = read_wkt("LINESTRING (0 0, 1 1)").unwrap_err();
        assert_eq!(err, ParseError::UnsupportedType("LINESTRING".to_string()));
    }

    #[test]
    fn test_trailing_input_rejected() {
        let err = read_wkt("POLYGON ((0 0, 1 0, 1 1, 0 0)) extra").unwrap_err();
        assert!(matches!(err, ParseError::TrailingInput { .. }));
    }

    #[test]
    fn test_truncated_input() {
        let err = read_wkt("POLYGON ((0 0, 1 0").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEnd { .. }));
    }

    #[test]
    fn test_empty_member_in_multipolygon() {
        let shape =
            read_wkt("MULTIPOLYGON (EMPTY, ((0 0, 1 0, 1 1, 0 0)))").unwrap();
        assert_eq!(shape.member_count(), 1);
    }

    #[test]
    fn test_error_reports_token_and_offset() {
        let err = read_wkt("POLYGON ((0 0, 1 0; 1 1, 0 0))").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedToken {
                found: ";".to_string(),
                expected: "',' or ')'",
                offset: 18,
            }
        );
    }

    #[test]
    fn test_bad_second_ring_is_reported() {
        let err = read_wkt("POLYGON ((0 0, 4 0, 4 4, 0 0), (1 1, 2 1, 2 2))").unwrap_err();
        assert_eq!(err, ParseError::UnclosedRing);
    }
}

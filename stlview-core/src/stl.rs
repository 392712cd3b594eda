/// STL decoder for binary and ASCII formats
use nom::{
    bytes::complete::tag,
    character::complete::{multispace0, multispace1, not_line_ending},
    multi::many0,
    number::complete::{float, le_f32, le_u16, le_u32},
    sequence::{preceded, tuple},
    IResult,
};
use thiserror::Error;

use crate::geometry::{Mesh, Triangle, Vertex};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StlError {
    #[error("file too small to be a valid STL ({len} bytes)")]
    TooSmall { len: usize },
    #[error("truncated binary STL: header declares {expected} facets, data holds {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("failed to parse ASCII STL: {0}")]
    Ascii(String),
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, StlError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(StlError::TooSmall { len: data.len() });
    }

    let body = &data[HEADER_LEN..];
    let (facets, declared) = le_u32::<_, nom::error::Error<&[u8]>>(body)
        .map_err(|_| StlError::TooSmall { len: data.len() })?;
    let declared = declared as usize;

    let available = facets.len() / FACET_LEN;
    if available < declared {
        return Err(StlError::Truncated {
            expected: declared,
            actual: available,
        });
    }

    let mut mesh = Mesh::with_capacity(declared);
    let mut input = facets;
    for _ in 0..declared {
        let (rest, triangle) = binary_facet(input).map_err(|_| StlError::Truncated {
            expected: declared,
            actual: mesh.triangle_count(),
        })?;
        mesh.add_triangle(triangle);
        input = rest;
    }

    Ok(mesh)
}

fn binary_vector3(input: &[u8]) -> IResult<&[u8], (f32, f32, f32)> {
    tuple((le_f32, le_f32, le_f32))(input)
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Triangle> {
    let (input, (nx, ny, nz)) = binary_vector3(input)?;
    let (input, a) = binary_vector3(input)?;
    let (input, b) = binary_vector3(input)?;
    let (input, c) = binary_vector3(input)?;
    // Attribute byte count, unused
    let (input, _) = le_u16(input)?;

    let vertex = |(x, y, z): (f32, f32, f32)| Vertex::new(x, y, z, nx, ny, nz);
    Ok((input, Triangle::new(vertex(a), vertex(b), vertex(c))))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, StlError> {
    match parse_ascii_stl_impl(input) {
        Ok((_, mesh)) => Ok(mesh),
        Err(e) => Err(StlError::Ascii(format!("{e:?}"))),
    }
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    // Optional solid name up to end of line
    let (input, _) = not_line_ending(input)?;
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _) = not_line_ending(input)?;
    let (input, _) = multispace0(input)?;

    let mut mesh = Mesh::with_capacity(triangles.len());
    for triangle in triangles {
        mesh.add_triangle(triangle);
    }

    Ok((input, mesh))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v1) = parse_vertex(input, normal)?;
    let (input, v2) = parse_vertex(input, normal)?;
    let (input, v3) = parse_vertex(input, normal)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, Triangle::new(v1, v2, v3)))
}

fn parse_vertex(input: &str, normal: (f32, f32, f32)) -> IResult<&str, Vertex> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, (x, y, z)) = parse_vector3(input)?;
    Ok((input, Vertex::new(x, y, z, normal.0, normal.1, normal.2)))
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}

/// Detect and parse STL file (binary or ASCII)
///
/// Many binary exporters write "solid" into the 80-byte header, so a failed
/// ASCII parse falls through to the binary decoder. Text that fails both
/// reports the ASCII error.
pub fn parse_stl(data: &[u8]) -> Result<Mesh, StlError> {
    let mut ascii_error = None;
    let trimmed = skip_leading_whitespace(data);
    if trimmed.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            match parse_ascii_stl(text) {
                Ok(mesh) => return Ok(mesh),
                Err(e) if data.len() < HEADER_LEN + 4 => return Err(e),
                Err(e) => ascii_error = Some(e),
            }
        }
    }

    parse_binary_stl(data).map_err(|binary_error| ascii_error.unwrap_or(binary_error))
}

fn skip_leading_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    &data[start..]
}

/// Encode a mesh as binary STL with the given header text
pub fn encode_binary_stl(mesh: &Mesh, header: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + 4 + mesh.triangle_count() * FACET_LEN);

    let mut head = [0u8; HEADER_LEN];
    let text = header.as_bytes();
    let n = text.len().min(HEADER_LEN);
    head[..n].copy_from_slice(&text[..n]);
    out.extend_from_slice(&head);
    out.extend_from_slice(&(mesh.triangle_count() as u32).to_le_bytes());

    for triangle in &mesh.triangles {
        let normal = triangle.calculate_normal();
        for c in normal.iter() {
            out.extend_from_slice(&c.to_le_bytes());
        }
        for vertex in &triangle.vertices {
            for c in vertex.position.coords.iter() {
                out.extend_from_slice(&c.to_le_bytes());
            }
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }

    out
}

//! Test utilities for playgen integration tests

// Internal imports (std, crate)
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

// External imports (alphabetized)
use anyhow::Context;
use tempfile::TempDir;

/// Creates a temporary directory for test outputs
pub fn create_temp_dir() -> anyhow::Result<(TempDir, PathBuf)> {
    let temp_dir = tempfile::tempdir()?;
    let temp_path = temp_dir.path().to_path_buf();
    Ok((temp_dir, temp_path))
}

/// Creates a Swagger 2.0 petstore spec in the given directory
pub fn create_test_swagger_spec(dir: &Path) -> anyhow::Result<PathBuf> {
    let spec_path = dir.join("petstore.yaml");
    let spec_content = r#"
swagger: "2.0"
info:
  title: Swagger Petstore
  version: 1.0.0
  description: Test API for playgen integration tests
host: petstore.swagger.io
basePath: /v2
schemes:
  - https
paths:
  /pet:
    post:
      tags: [pet]
      operationId: addPet
      consumes: [application/json]
      parameters:
        - in: body
          name: body
          required: true
          schema:
            $ref: '#/definitions/Pet'
      responses:
        '200':
          description: successful operation
          schema:
            $ref: '#/definitions/Pet'
  /pet/findByStatus:
    get:
      tags: [pet]
      operationId: findPetsByStatus
      parameters:
        - in: query
          name: status
          required: true
          type: array
          items:
            type: string
      responses:
        '200':
          description: successful operation
          schema:
            type: array
            items:
              $ref: '#/definitions/Pet'
  /pet/{petId}:
    get:
      tags: [pet]
      operationId: getPetById
      parameters:
        - in: path
          name: petId
          required: true
          type: integer
          format: int64
      responses:
        '200':
          description: successful operation
          schema:
            $ref: '#/definitions/Pet'
  /user/login:
    get:
      tags: [user]
      operationId: loginUser
      parameters:
        - in: query
          name: username
          required: true
          type: string
        - in: query
          name: password
          required: true
          type: string
      responses:
        '200':
          description: successful operation
          schema:
            type: string
definitions:
  Category:
    type: object
    properties:
      id:
        type: integer
        format: int64
      name:
        type: string
  Pet:
    type: object
    description: A pet for sale in the pet store
    required: [name]
    properties:
      id:
        type: integer
        format: int64
      category:
        $ref: '#/definitions/Category'
      name:
        type: string
      status:
        type: string
        enum: [available, pending, sold]
"#;

    fs::write(&spec_path, spec_content).context("Failed to write test spec")?;
    Ok(spec_path)
}

/// Runs the playgen binary with the given arguments
pub fn run_playgen<I, S>(args: I) -> anyhow::Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    Command::new(env!("CARGO_BIN_EXE_playgen"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .context("Failed to execute playgen")
}

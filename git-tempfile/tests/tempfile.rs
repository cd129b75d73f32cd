mod tempfile;
